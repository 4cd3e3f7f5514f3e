//! Metrics collection for the ledger
//!
//! Rejections are never reported to peers; these counters are where they
//! show up.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the ledger
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    /// Local submissions persisted
    pub transactions_submitted: AtomicU64,

    /// Transactions persisted from peer announces
    pub transactions_received: AtomicU64,

    /// Entries applied to the mempool space (counted per cycle)
    pub transactions_accepted: AtomicU64,

    /// Entries dropped by the state machine
    pub transactions_discarded: AtomicU64,

    /// Entries deleted because they were already on chain
    pub entries_pruned: AtomicU64,

    /// Blocks mined locally
    pub blocks_minted: AtomicU64,

    /// Peer blocks merged
    pub blocks_merged: AtomicU64,

    /// Peer blocks dropped
    pub blocks_rejected: AtomicU64,

    /// Cycles that ended below the work threshold
    pub mints_skipped: AtomicU64,

    /// Total PoW mining time (milliseconds)
    pub mining_time_ms: AtomicU64,
}

impl LedgerMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, from_peer: bool) {
        let counter = if from_peer {
            &self.transactions_received
        } else {
            &self.transactions_submitted
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one scan
    pub fn record_scan(&self, accepted: usize, discarded: usize, pruned: usize) {
        self.transactions_accepted
            .fetch_add(accepted as u64, Ordering::Relaxed);
        self.transactions_discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
        self.entries_pruned
            .fetch_add(pruned as u64, Ordering::Relaxed);
    }

    pub fn record_minted(&self) {
        self.blocks_minted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merged(&self) {
        self.blocks_merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_block(&self) {
        self.blocks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.mints_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record PoW mining time
    pub fn record_mining_time(&self, duration_ms: u64) {
        self.mining_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn blocks_minted(&self) -> u64 {
        self.blocks_minted.load(Ordering::Relaxed)
    }

    pub fn blocks_merged(&self) -> u64 {
        self.blocks_merged.load(Ordering::Relaxed)
    }

    pub fn transactions_discarded(&self) -> u64 {
        self.transactions_discarded.load(Ordering::Relaxed)
    }

    /// Average mining time per minted block (milliseconds)
    pub fn avg_mining_time_ms(&self) -> f64 {
        let blocks = self.blocks_minted.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        self.mining_time_ms.load(Ordering::Relaxed) as f64 / blocks as f64
    }
}
