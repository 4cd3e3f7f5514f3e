//! # Ledger
//!
//! Owns the state machine, both stores and the chain head. Every mutation of
//! a state space, a store or the height goes through `&mut Ledger`, so a
//! single lock around it serializes peer announces against scanning.
//!
//! ## Cycle
//!
//! ```text
//! Idle ──scan()──→ Scanning ──prepare_mint()──→ Minting ──commit_block()──→ Idle
//!                     │                            │
//!                     └── below threshold ──→ Idle └── abort_mint() ──→ Idle
//! ```

use crate::config::LedgerConfig;
use crate::domain::entities::{
    CycleOutcome, Discarded, LedgerPhase, MintCandidate, MintedBlock, ScanReport,
};
use crate::error::{LedgerError, Result};
use crate::metrics::LedgerMetrics;
use crate::ports::outbound::{
    check_key, BlockStore, InMemoryBlockStore, InMemoryMempoolStore, MempoolStore,
};
use b2_01_state_machine::{apply_to_space, ApplyMode, Space, StateMachine, StateSpace};
use b2_02_proof_of_work::{estimated_work_for, meets_difficulty, mine};
use parking_lot::Mutex;
use shared_types::{
    short_hex, BlockBody, BlockHeight, ChainSummary, Hash, VerifiedInstruction,
    EMPTY_CHAIN_HEIGHT,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ledger handle shared by the cycle task and the reconciliation layer.
pub type SharedLedger = Arc<Mutex<Ledger>>;

pub struct Ledger {
    config: LedgerConfig,
    state: StateMachine,
    blocks: Box<dyn BlockStore>,
    mempool: Box<dyn MempoolStore>,
    height: BlockHeight,
    head_hash: Hash,
    mainnet_txs: HashSet<Hash>,
    phase: LedgerPhase,
    metrics: Arc<LedgerMetrics>,
}

impl Ledger {
    /// Open a ledger over existing stores, replaying every persisted block.
    pub fn open(
        config: LedgerConfig,
        blocks: Box<dyn BlockStore>,
        mempool: Box<dyn MempoolStore>,
    ) -> Result<Self> {
        config.validate()?;

        let mut ledger = Self {
            config,
            state: StateMachine::new(),
            blocks,
            mempool,
            height: EMPTY_CHAIN_HEIGHT,
            head_hash: Hash::new(),
            mainnet_txs: HashSet::new(),
            phase: LedgerPhase::Idle,
            metrics: Arc::new(LedgerMetrics::new()),
        };
        ledger.replay()?;
        Ok(ledger)
    }

    /// Ledger over empty in-memory stores.
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::open(
            config,
            Box::new(InMemoryBlockStore::new()),
            Box::new(InMemoryMempoolStore::new()),
        )
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    fn replay(&mut self) -> Result<()> {
        let heights = self.blocks.heights()?;

        for (expected, height) in (0..).zip(heights.iter().copied()) {
            if height != expected {
                return Err(LedgerError::ChainBroken {
                    height: expected,
                    reason: format!("missing block, next stored height is {height}"),
                });
            }
            let block = self
                .blocks
                .get(height)?
                .ok_or_else(|| LedgerError::ChainBroken {
                    height,
                    reason: "record disappeared during replay".into(),
                })?;

            let body = self
                .linked_body(&block)
                .map_err(|reason| LedgerError::ChainBroken { height, reason })?;
            let mainnet = self
                .apply_body(&body)
                .map_err(|e| LedgerError::ChainBroken {
                    height,
                    reason: e.to_string(),
                })?;
            self.advance(height, &block, &body, mainnet);
        }

        self.state.mirror(Space::Mainnet, Space::Mempool);

        if self.height >= 0 {
            info!(
                "[b2-03] 💾 Replayed {} blocks, head {} ({} transactions on chain)",
                self.height + 1,
                short_hex(&self.head_hash),
                self.mainnet_txs.len()
            );
        } else {
            info!("[b2-03] 📁 Empty chain, waiting for genesis");
        }
        Ok(())
    }

    /// Decode `block` and check it is committed and extends the current head.
    fn linked_body(&self, block: &VerifiedInstruction) -> std::result::Result<BlockBody, String> {
        if !block.verify_commitment() {
            return Err(format!("commitment mismatch for {}", block.short_hash()));
        }
        let body = BlockBody::decode(&block.data).map_err(|e| format!("undecodable body: {e}"))?;
        if body.prev != self.head_hash {
            return Err(format!(
                "prev {:?} does not extend head {:?}",
                body.prev, self.head_hash
            ));
        }
        Ok(body)
    }

    /// Mainnet as it would be after `body`, leaving the live space untouched.
    fn apply_body(&self, body: &BlockBody) -> Result<StateSpace> {
        let mut scratch = self.state.space(Space::Mainnet).clone();
        for tx in &body.transactions {
            apply_to_space(&mut scratch, tx, ApplyMode::Commit)?;
        }
        Ok(scratch)
    }

    fn advance(
        &mut self,
        height: BlockHeight,
        block: &VerifiedInstruction,
        body: &BlockBody,
        mainnet: StateSpace,
    ) {
        self.state.replace(Space::Mainnet, mainnet);
        self.mainnet_txs
            .extend(body.transactions.iter().map(|tx| tx.hash.clone()));
        self.height = height;
        self.head_hash = block.hash.clone();
    }

    /// Persist `block`, move the head onto it and drop its entries from the mempool store.
    fn extend_chain(
        &mut self,
        height: BlockHeight,
        block: VerifiedInstruction,
        body: &BlockBody,
        mainnet: StateSpace,
    ) -> Result<MintedBlock> {
        self.blocks.put(height, &block)?;
        self.advance(height, &block, body, mainnet);

        for tx in &body.transactions {
            // Leftovers are pruned by the next scan.
            if let Err(e) = self.mempool.remove(&tx.hash) {
                warn!(hash = tx.short_hash(), error = %e, "Could not remove included entry");
            }
        }

        Ok(MintedBlock {
            height,
            transactions: body.transactions.len(),
            block,
        })
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Local submission: dry-run against mainnet, then persist.
    ///
    /// Returns false if the entry was already pending.
    pub fn submit(&mut self, tx: &VerifiedInstruction) -> Result<bool> {
        self.state.apply(Space::Mainnet, tx, ApplyMode::DryRun)?;
        let stored = self.mempool.put_if_absent(tx)?;
        if stored {
            self.metrics.record_submitted(false);
            debug!(hash = tx.short_hash(), "Local transaction stored");
        }
        Ok(stored)
    }

    /// Peer announce: persist without validation; the next scan decides.
    ///
    /// Returns false if the entry was already pending or is already on chain.
    pub fn store_pending(&mut self, tx: &VerifiedInstruction) -> Result<bool> {
        check_key(&tx.hash)?;
        if self.mainnet_txs.contains(&tx.hash) {
            return Ok(false);
        }
        let stored = self.mempool.put_if_absent(tx)?;
        if stored {
            self.metrics.record_submitted(true);
            debug!(hash = tx.short_hash(), "Peer transaction stored");
        }
        Ok(stored)
    }

    // =========================================================================
    // CYCLE
    // =========================================================================

    /// Rebuild the mempool space from mainnet and apply every pending entry.
    ///
    /// Passes repeat until one accepts nothing. Entries the state machine
    /// refuses are deleted; entries already on chain are pruned.
    pub fn scan(&mut self) -> Result<ScanReport> {
        self.phase = LedgerPhase::Scanning;
        let result = self.scan_passes();
        if result.is_err() {
            self.phase = LedgerPhase::Idle;
        }
        result
    }

    fn scan_passes(&mut self) -> Result<ScanReport> {
        self.state.mirror(Space::Mainnet, Space::Mempool);

        let mut report = ScanReport::default();
        let mut accepted: HashSet<Hash> = HashSet::new();

        loop {
            report.passes += 1;
            let mut found = 0usize;

            for hash in self.mempool.hashes()? {
                if self.mainnet_txs.contains(&hash) {
                    self.mempool.remove(&hash)?;
                    report.pruned += 1;
                    continue;
                }
                if accepted.contains(&hash) {
                    continue;
                }

                let entry = match self.mempool.get(&hash) {
                    Ok(Some(entry)) => entry,
                    Ok(None) => continue,
                    Err(LedgerError::CorruptRecord { reason, .. }) => {
                        self.discard(&mut report, &hash, reason)?;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if entry.hash != hash {
                    self.discard(&mut report, &hash, "stored under a foreign key".into())?;
                    continue;
                }

                match self.state.apply(Space::Mempool, &entry, ApplyMode::Commit) {
                    Ok(()) => {
                        report.cumulative_work = report
                            .cumulative_work
                            .saturating_add(estimated_work_for(&entry.hash));
                        accepted.insert(hash);
                        report.accepted.push(entry);
                        found += 1;
                    }
                    Err(e) => self.discard(&mut report, &hash, e.to_string())?,
                }
            }

            if found == 0 {
                break;
            }
        }

        self.metrics
            .record_scan(report.accepted.len(), report.discarded.len(), report.pruned);
        debug!(
            accepted = report.accepted.len(),
            discarded = report.discarded.len(),
            pruned = report.pruned,
            passes = report.passes,
            cumulative_work = report.cumulative_work,
            "Mempool scanned"
        );
        Ok(report)
    }

    fn discard(&mut self, report: &mut ScanReport, hash: &str, reason: String) -> Result<()> {
        self.mempool.remove(hash)?;
        debug!(hash, %reason, "Mempool entry discarded");
        report.discarded.push(Discarded {
            hash: hash.to_string(),
            reason,
        });
        Ok(())
    }

    /// Snapshot the accepted entries for mining if their work exceeds the threshold.
    pub fn prepare_mint(&mut self, report: &ScanReport) -> Result<Option<MintCandidate>> {
        if report.cumulative_work <= self.config.work_threshold {
            self.phase = LedgerPhase::Idle;
            self.metrics.record_skipped();
            info!(
                "[b2-03] Not enough cumulative work to mint: {}/{}",
                report.cumulative_work, self.config.work_threshold
            );
            return Ok(None);
        }

        let body = BlockBody {
            transactions: report.accepted.clone(),
            prev: self.head_hash.clone(),
        };
        let payload = match body.encode() {
            Ok(payload) => payload,
            Err(e) => {
                self.phase = LedgerPhase::Idle;
                return Err(LedgerError::Serialization(e.to_string()));
            }
        };

        self.phase = LedgerPhase::Minting;
        info!(
            "[b2-03] ⛏️  Building block {} with {} transactions",
            self.height + 1,
            body.transactions.len()
        );
        Ok(Some(MintCandidate {
            height: self.height + 1,
            body,
            payload,
            difficulty: self.config.difficulty,
        }))
    }

    /// Persist a sealed candidate and move the head onto it.
    pub fn commit_block(
        &mut self,
        candidate: &MintCandidate,
        sealed: VerifiedInstruction,
    ) -> Result<MintedBlock> {
        let result = self.commit_sealed(candidate, sealed);
        self.phase = LedgerPhase::Idle;

        if let Ok(minted) = &result {
            self.metrics.record_minted();
            if minted.is_genesis() {
                info!("[b2-03] 🎉 Genesis block built: {}", minted.block.hash);
            } else {
                info!(
                    "[b2-03] ✅ Block {} has been built: {}",
                    minted.height, minted.block.hash
                );
            }
        }
        result
    }

    fn commit_sealed(
        &mut self,
        candidate: &MintCandidate,
        sealed: VerifiedInstruction,
    ) -> Result<MintedBlock> {
        if candidate.height != self.height + 1 || candidate.prev() != self.head_hash {
            return Err(LedgerError::StaleCandidate {
                expected_prev: candidate.prev().to_string(),
                head: self.head_hash.clone(),
            });
        }
        if sealed.data != candidate.payload
            || !sealed.verify_commitment()
            || !meets_difficulty(&sealed.hash, candidate.difficulty)
        {
            return Err(LedgerError::InvalidBlock(
                "sealed block does not match its candidate".into(),
            ));
        }

        let mainnet = self.apply_body(&candidate.body)?;
        self.extend_chain(candidate.height, sealed, &candidate.body, mainnet)
    }

    /// Return to Idle after a candidate was abandoned.
    pub fn abort_mint(&mut self) {
        if self.phase == LedgerPhase::Minting {
            debug!("Mint abandoned");
        }
        self.phase = LedgerPhase::Idle;
    }

    /// Scan, decide and mine in one call. Blocks the caller while mining.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let report = self.scan()?;
        let Some(candidate) = self.prepare_mint(&report)? else {
            return Ok(CycleOutcome::BelowThreshold {
                cumulative_work: report.cumulative_work,
                threshold: self.config.work_threshold,
            });
        };

        let started = std::time::Instant::now();
        let sealed = match mine(&candidate.payload, candidate.difficulty) {
            Ok(sealed) => sealed,
            Err(e) => {
                self.abort_mint();
                return Err(e.into());
            }
        };
        self.metrics
            .record_mining_time(started.elapsed().as_millis() as u64);

        self.commit_block(&candidate, sealed).map(CycleOutcome::Minted)
    }

    // =========================================================================
    // PEER BLOCKS
    // =========================================================================

    /// Merge a block announced by a peer that directly extends the head.
    ///
    /// Admission policy (difficulty, freshness) is the caller's; this only
    /// refuses blocks that would break the chain or the state.
    pub fn accept_peer_block(&mut self, block: &VerifiedInstruction) -> Result<MintedBlock> {
        let body = self.linked_body(block).map_err(LedgerError::InvalidBlock)?;
        let mainnet = self.apply_body(&body)?;
        let minted = self.extend_chain(self.height + 1, block.clone(), &body, mainnet)?;

        self.metrics.record_merged();
        info!(
            "[b2-03] 📥 Merged peer block {} ({} transactions): {}",
            minted.height, minted.transactions, minted.block.hash
        );
        Ok(minted)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Highest block height, `-1` when the chain is empty.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Hash of the block at [`height`](Self::height), empty when the chain is empty.
    pub fn head_hash(&self) -> &str {
        &self.head_hash
    }

    pub fn block_at(&self, height: BlockHeight) -> Result<Option<VerifiedInstruction>> {
        self.blocks.get(height)
    }

    /// Blocks in `(after, height]`, ascending.
    pub fn blocks_after(&self, after: BlockHeight) -> Result<Vec<(BlockHeight, VerifiedInstruction)>> {
        let mut blocks = Vec::new();
        if after >= self.height {
            return Ok(blocks);
        }
        let first = after.max(EMPTY_CHAIN_HEIGHT).saturating_add(1);
        for height in first..=self.height {
            match self.blocks.get(height)? {
                Some(block) => blocks.push((height, block)),
                None => {
                    return Err(LedgerError::ChainBroken {
                        height,
                        reason: "block missing from store".into(),
                    })
                }
            }
        }
        Ok(blocks)
    }

    pub fn pending(&self, hash: &str) -> Result<Option<VerifiedInstruction>> {
        self.mempool.get(hash)
    }

    pub fn pending_hashes(&self) -> Result<Vec<Hash>> {
        self.mempool.hashes()
    }

    /// True if `hash` was included in a block on the local chain.
    pub fn is_on_chain(&self, hash: &str) -> bool {
        self.mainnet_txs.contains(hash)
    }

    /// Local view for reconciliation.
    pub fn summary(&self) -> Result<ChainSummary> {
        Ok(ChainSummary {
            block_number: self.height,
            mempool_transaction_hashes: self.mempool.hashes()?.into_iter().collect(),
        })
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<LedgerMetrics> {
        Arc::clone(&self.metrics)
    }
}
