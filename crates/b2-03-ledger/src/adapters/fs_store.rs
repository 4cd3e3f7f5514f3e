//! Directory-backed stores.
//!
//! ```text
//! <data_dir>/blocks/<height>.json    one VerifiedInstruction per block
//! <data_dir>/mempool/<hash>.json     one VerifiedInstruction per pending tx
//! ```
//!
//! Files whose names start with `.` are ignored. Writes go to a hidden
//! temporary file first and are renamed into place.

use crate::error::{LedgerError, Result};
use crate::ports::outbound::{check_key, BlockStore, MempoolStore};
use shared_types::{is_well_formed_hash, BlockHeight, Hash, VerifiedInstruction};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const BLOCKS_DIR: &str = "blocks";
pub const MEMPOOL_DIR: &str = "mempool";
const RECORD_EXT: &str = ".json";

fn write_record(dir: &Path, file_name: &str, record: &VerifiedInstruction) -> Result<()> {
    let bytes =
        serde_json::to_vec(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let temp_path = dir.join(format!(".{file_name}.tmp"));
    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, dir.join(file_name))?;
    Ok(())
}

fn read_record(path: &Path, key: &str) -> Result<Option<VerifiedInstruction>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| LedgerError::CorruptRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Visible `*.json` record stems in `dir`.
fn record_stems(dir: &Path) -> Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if let Some(stem) = name.strip_suffix(RECORD_EXT) {
            stems.push(stem.to_string());
        }
    }
    Ok(stems)
}

/// Block store under `<data_dir>/blocks`.
#[derive(Debug, Clone)]
pub struct FsBlockStore {
    dir: PathBuf,
}

impl FsBlockStore {
    /// Open (creating if needed) the block directory under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let dir = data_dir.as_ref().join(BLOCKS_DIR);
        std::fs::create_dir_all(&dir)?;
        info!("[b2-03] 📁 Block store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, height: BlockHeight) -> PathBuf {
        self.dir.join(format!("{height}{RECORD_EXT}"))
    }
}

impl BlockStore for FsBlockStore {
    fn put(&mut self, height: BlockHeight, block: &VerifiedInstruction) -> Result<()> {
        if height < 0 {
            return Err(LedgerError::InvalidKey(height.to_string()));
        }
        write_record(&self.dir, &format!("{height}{RECORD_EXT}"), block)?;
        debug!(height, hash = block.short_hash(), "Block persisted");
        Ok(())
    }

    fn get(&self, height: BlockHeight) -> Result<Option<VerifiedInstruction>> {
        read_record(&self.path(height), &height.to_string())
    }

    fn heights(&self) -> Result<Vec<BlockHeight>> {
        let mut heights: Vec<BlockHeight> = record_stems(&self.dir)?
            .iter()
            .filter_map(|stem| stem.parse::<BlockHeight>().ok())
            .filter(|h| *h >= 0)
            .collect();
        heights.sort_unstable();
        Ok(heights)
    }
}

/// Mempool store under `<data_dir>/mempool`.
#[derive(Debug, Clone)]
pub struct FsMempoolStore {
    dir: PathBuf,
}

impl FsMempoolStore {
    /// Open (creating if needed) the mempool directory under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let dir = data_dir.as_ref().join(MEMPOOL_DIR);
        std::fs::create_dir_all(&dir)?;
        info!("[b2-03] 📁 Mempool store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}{RECORD_EXT}"))
    }
}

impl MempoolStore for FsMempoolStore {
    fn put_if_absent(&mut self, tx: &VerifiedInstruction) -> Result<bool> {
        check_key(&tx.hash)?;
        if self.path(&tx.hash).exists() {
            return Ok(false);
        }
        write_record(&self.dir, &format!("{}{RECORD_EXT}", tx.hash), tx)?;
        Ok(true)
    }

    fn get(&self, hash: &str) -> Result<Option<VerifiedInstruction>> {
        check_key(hash)?;
        read_record(&self.path(hash), hash)
    }

    fn remove(&mut self, hash: &str) -> Result<()> {
        check_key(hash)?;
        match std::fs::remove_file(self.path(hash)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn hashes(&self) -> Result<Vec<Hash>> {
        let mut hashes: Vec<Hash> = record_stems(&self.dir)?
            .into_iter()
            .filter(|stem| is_well_formed_hash(stem))
            .collect();
        hashes.sort_unstable();
        Ok(hashes)
    }

    fn contains(&self, hash: &str) -> Result<bool> {
        check_key(hash)?;
        Ok(self.path(hash).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tx(n: u32) -> VerifiedInstruction {
        VerifiedInstruction::seal(format!("INSERT INTO t (n) VALUES ('{n}')"), 0)
    }

    #[test]
    fn test_block_store_layout() {
        let dir = TempDir::new().unwrap();
        let mut store = FsBlockStore::open(dir.path()).unwrap();
        let block = VerifiedInstruction::seal(r#"{"transactions":[],"prev":""}"#, 1);

        store.put(0, &block).unwrap();
        store.put(2, &block).unwrap();

        assert!(dir.path().join("blocks/0.json").exists());
        assert_eq!(store.heights().unwrap(), vec![0, 2]);
        assert_eq!(store.latest_height().unwrap(), 2);
        assert_eq!(store.get(0).unwrap(), Some(block));
        assert_eq!(store.get(1).unwrap(), None);
    }

    #[test]
    fn test_block_store_ignores_hidden_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FsBlockStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("blocks/.gitkeep"), b"").unwrap();
        std::fs::write(dir.path().join("blocks/.7.json.tmp"), b"").unwrap();
        std::fs::write(dir.path().join("blocks/notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("blocks/abc.json"), b"").unwrap();
        assert!(store.heights().unwrap().is_empty());
    }

    #[test]
    fn test_block_store_heights_sorted_numerically() {
        let dir = TempDir::new().unwrap();
        let mut store = FsBlockStore::open(dir.path()).unwrap();
        let block = VerifiedInstruction::seal("{}", 0);
        for h in [10, 2, 1, 0] {
            store.put(h, &block).unwrap();
        }
        assert_eq!(store.heights().unwrap(), vec![0, 1, 2, 10]);
    }

    #[test]
    fn test_corrupt_block_record() {
        let dir = TempDir::new().unwrap();
        let store = FsBlockStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("blocks/0.json"), b"not json").unwrap();
        assert!(matches!(
            store.get(0),
            Err(LedgerError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_mempool_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = FsMempoolStore::open(dir.path()).unwrap();
        let a = tx(1);
        let b = tx(2);

        assert!(store.put_if_absent(&a).unwrap());
        assert!(!store.put_if_absent(&a).unwrap());
        assert!(store.put_if_absent(&b).unwrap());
        std::fs::write(dir.path().join("mempool/.DS_Store"), b"").unwrap();

        let mut expected = vec![a.hash.clone(), b.hash.clone()];
        expected.sort();
        assert_eq!(store.hashes().unwrap(), expected);
        assert_eq!(store.get(&a.hash).unwrap(), Some(a.clone()));
        assert!(store.contains(&b.hash).unwrap());

        store.remove(&a.hash).unwrap();
        store.remove(&a.hash).unwrap();
        assert_eq!(store.hashes().unwrap(), vec![b.hash.clone()]);
        assert!(!dir.path().join(format!("mempool/{}.json", a.hash)).exists());
    }

    #[test]
    fn test_mempool_store_refuses_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FsMempoolStore::open(dir.path()).unwrap();
        let evil = VerifiedInstruction {
            data: "x".into(),
            nonce: 0,
            hash: "../blocks/0".into(),
        };
        assert!(matches!(
            store.put_if_absent(&evil),
            Err(LedgerError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("../blocks/0"),
            Err(LedgerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_reopen_sees_existing_records() {
        let dir = TempDir::new().unwrap();
        let a = tx(7);
        {
            let mut store = FsMempoolStore::open(dir.path()).unwrap();
            store.put_if_absent(&a).unwrap();
        }
        let store = FsMempoolStore::open(dir.path()).unwrap();
        assert_eq!(store.hashes().unwrap(), vec![a.hash]);
    }
}
