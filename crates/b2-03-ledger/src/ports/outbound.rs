//! # Outbound Ports (Driven Ports)
//!
//! Storage the ledger depends on. Blocks are keyed by height, pending
//! transactions by hash.

use crate::error::{LedgerError, Result};
use shared_types::{is_well_formed_hash, BlockHeight, Hash, VerifiedInstruction};
use std::collections::BTreeMap;

/// One record per block, enumerable in height order.
pub trait BlockStore: Send + Sync {
    /// Persist `block` at `height`, replacing any previous record.
    fn put(&mut self, height: BlockHeight, block: &VerifiedInstruction) -> Result<()>;

    /// Block at `height`, if present.
    fn get(&self, height: BlockHeight) -> Result<Option<VerifiedInstruction>>;

    /// All stored heights, ascending.
    fn heights(&self) -> Result<Vec<BlockHeight>>;

    /// Highest stored height, `-1` when empty.
    fn latest_height(&self) -> Result<BlockHeight> {
        Ok(self
            .heights()?
            .last()
            .copied()
            .unwrap_or(shared_types::EMPTY_CHAIN_HEIGHT))
    }
}

/// One record per pending transaction, keyed by its hash.
pub trait MempoolStore: Send + Sync {
    /// Persist `tx` unless an entry with the same hash exists. Returns true if written.
    fn put_if_absent(&mut self, tx: &VerifiedInstruction) -> Result<bool>;

    /// Entry stored under `hash`, if present.
    fn get(&self, hash: &str) -> Result<Option<VerifiedInstruction>>;

    /// Delete the entry stored under `hash`. Missing entries are not an error.
    fn remove(&mut self, hash: &str) -> Result<()>;

    /// All stored hashes.
    fn hashes(&self) -> Result<Vec<Hash>>;

    fn contains(&self, hash: &str) -> Result<bool> {
        Ok(self.get(hash)?.is_some())
    }
}

/// Refuse anything that is not a digest before it becomes a store key.
pub fn check_key(hash: &str) -> Result<()> {
    if is_well_formed_hash(hash) {
        Ok(())
    } else {
        Err(LedgerError::InvalidKey(hash.chars().take(80).collect()))
    }
}

// =============================================================================
// In-memory implementations (tests and ephemeral nodes)
// =============================================================================

/// In-memory block store
#[derive(Debug, Default, Clone)]
pub struct InMemoryBlockStore {
    blocks: BTreeMap<BlockHeight, VerifiedInstruction>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn put(&mut self, height: BlockHeight, block: &VerifiedInstruction) -> Result<()> {
        self.blocks.insert(height, block.clone());
        Ok(())
    }

    fn get(&self, height: BlockHeight) -> Result<Option<VerifiedInstruction>> {
        Ok(self.blocks.get(&height).cloned())
    }

    fn heights(&self) -> Result<Vec<BlockHeight>> {
        Ok(self.blocks.keys().copied().collect())
    }
}

/// In-memory mempool store
#[derive(Debug, Default, Clone)]
pub struct InMemoryMempoolStore {
    entries: BTreeMap<Hash, VerifiedInstruction>,
}

impl InMemoryMempoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MempoolStore for InMemoryMempoolStore {
    fn put_if_absent(&mut self, tx: &VerifiedInstruction) -> Result<bool> {
        check_key(&tx.hash)?;
        if self.entries.contains_key(&tx.hash) {
            return Ok(false);
        }
        self.entries.insert(tx.hash.clone(), tx.clone());
        Ok(true)
    }

    fn get(&self, hash: &str) -> Result<Option<VerifiedInstruction>> {
        Ok(self.entries.get(hash).cloned())
    }

    fn remove(&mut self, hash: &str) -> Result<()> {
        self.entries.remove(hash);
        Ok(())
    }

    fn hashes(&self) -> Result<Vec<Hash>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
