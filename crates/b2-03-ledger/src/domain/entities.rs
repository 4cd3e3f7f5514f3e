//! # Ledger Entities
//!
//! Values passed between the scan, mint and commit steps.

use serde::Serialize;
use shared_types::{BlockBody, BlockHeight, Hash, VerifiedInstruction};
use std::fmt;

/// Where the ledger is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LedgerPhase {
    Idle,
    Scanning,
    Minting,
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Minting => "minting",
        };
        f.write_str(name)
    }
}

/// A mempool entry dropped during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discarded {
    pub hash: Hash,
    pub reason: String,
}

/// Outcome of one scanning pass over the mempool store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries applied to the mempool space, in acceptance order.
    pub accepted: Vec<VerifiedInstruction>,
    /// Sum of `estimated_work_for` over accepted entries (saturating).
    pub cumulative_work: u64,
    /// Entries refused by the state machine and deleted.
    pub discarded: Vec<Discarded>,
    /// Entries deleted because they are already on chain.
    pub pruned: usize,
    /// Number of passes made over the store.
    pub passes: usize,
}

/// Immutable snapshot handed to the miner.
///
/// Built under the ledger lock; mining happens without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCandidate {
    /// Height the block will be stored at.
    pub height: BlockHeight,
    /// Body to seal.
    pub body: BlockBody,
    /// Canonical JSON encoding of `body`.
    pub payload: String,
    /// Required leading zeros.
    pub difficulty: u32,
}

impl MintCandidate {
    pub fn prev(&self) -> &str {
        &self.body.prev
    }
}

/// A block that extended the local chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedBlock {
    pub height: BlockHeight,
    pub block: VerifiedInstruction,
    pub transactions: usize,
}

impl MintedBlock {
    /// The first block of the chain.
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

/// Result of a full scan/mint cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Minted(MintedBlock),
    BelowThreshold { cumulative_work: u64, threshold: u64 },
}

impl CycleOutcome {
    pub fn minted(&self) -> Option<&MintedBlock> {
        match self {
            Self::Minted(block) => Some(block),
            Self::BelowThreshold { .. } => None,
        }
    }
}
