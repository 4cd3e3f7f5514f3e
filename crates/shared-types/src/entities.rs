//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Instructions**: [`VerifiedInstruction`] (transactions and sealed blocks)
//! - **Chain**: [`BlockBody`], [`BlockHeight`]
//! - **Reconciliation**: [`ChainSummary`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::hashing::{commitment, short_hex};

/// Hex-encoded SHA-256 digest.
pub type Hash = String;

/// Height of a block in the chain. `-1` denotes an empty chain.
pub type BlockHeight = i64;

/// Height reported by a node that has not persisted any block yet.
pub const EMPTY_CHAIN_HEIGHT: BlockHeight = -1;

/// A hash-committed instruction.
///
/// Transactions carry a single `INSERT INTO` statement in `data`; blocks carry
/// the JSON encoding of a [`BlockBody`]. The `hash` is only meaningful once
/// [`verify_commitment`](Self::verify_commitment) has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedInstruction {
    /// Statement text or serialized block body.
    pub data: String,
    /// Nonce mixed into the commitment.
    pub nonce: u64,
    /// Declared commitment, `digest(data ++ nonce)`.
    pub hash: Hash,
}

impl VerifiedInstruction {
    /// Build an instruction whose hash is computed from `data` and `nonce`.
    pub fn seal(data: impl Into<String>, nonce: u64) -> Self {
        let data = data.into();
        let hash = commitment(&data, nonce);
        Self { data, nonce, hash }
    }

    /// Recompute the commitment and compare it with the declared hash.
    pub fn verify_commitment(&self) -> bool {
        commitment(&self.data, self.nonce) == self.hash
    }

    /// Short hash prefix for log lines.
    pub fn short_hash(&self) -> &str {
        short_hex(&self.hash)
    }
}

/// Payload sealed into a block: the included transactions and the parent hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Transactions included in the block, in acceptance order.
    pub transactions: Vec<VerifiedInstruction>,
    /// Hash of the previous block; empty for the root block.
    pub prev: Hash,
}

impl BlockBody {
    /// Canonical JSON encoding used as the block's `data`.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode the body carried in a block's `data`.
    pub fn decode(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

/// Local view exchanged during reconciliation.
///
/// Derived on demand from the highest persisted height and the current
/// mempool entry set; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainSummary {
    /// Highest persisted block height, [`EMPTY_CHAIN_HEIGHT`] when empty.
    pub block_number: BlockHeight,
    /// Hashes of all pending mempool entries.
    pub mempool_transaction_hashes: BTreeSet<Hash>,
}

impl ChainSummary {
    /// Summary of a node with no blocks and no pending entries.
    pub fn empty() -> Self {
        Self {
            block_number: EMPTY_CHAIN_HEIGHT,
            mempool_transaction_hashes: BTreeSet::new(),
        }
    }
}
