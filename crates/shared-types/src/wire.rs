//! # Peer Wire Format
//!
//! UTF-8 JSON messages discriminated by a `type` field:
//!
//! ```text
//! {"type":"compareState","blockNumber":4,"mempoolTransactionHashes":["ab..",..]}
//! {"type":"announce","block":{..}}
//! {"type":"announce","tx":{..}}
//! ```
//!
//! An announce carrying both `block` and `tx` is legal; receivers treat the
//! two as independent facts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entities::{BlockHeight, ChainSummary, Hash, VerifiedInstruction};

/// Message exchanged between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerMessage {
    /// Sender's chain summary; the receiver replies with what the sender lacks.
    #[serde(rename = "compareState", rename_all = "camelCase")]
    CompareState {
        /// Sender's highest block height (`-1` for an empty chain).
        block_number: BlockHeight,
        /// Hashes of the sender's pending mempool entries.
        #[serde(alias = "mempoolTransactions", default)]
        mempool_transaction_hashes: BTreeSet<Hash>,
    },

    /// A block and/or a transaction the receiver may be missing.
    #[serde(rename = "announce")]
    Announce {
        /// A sealed block.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block: Option<VerifiedInstruction>,
        /// A pending transaction.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tx: Option<VerifiedInstruction>,
    },
}

impl PeerMessage {
    /// `compareState` message for a local summary.
    pub fn compare_state(summary: ChainSummary) -> Self {
        Self::CompareState {
            block_number: summary.block_number,
            mempool_transaction_hashes: summary.mempool_transaction_hashes,
        }
    }

    /// `announce` carrying a block.
    pub fn announce_block(block: VerifiedInstruction) -> Self {
        Self::Announce {
            block: Some(block),
            tx: None,
        }
    }

    /// `announce` carrying a transaction.
    pub fn announce_tx(tx: VerifiedInstruction) -> Self {
        Self::Announce {
            block: None,
            tx: Some(tx),
        }
    }

    /// Encode as a JSON byte frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing these variants cannot fail: every field is a plain
        // string, integer, or sequence thereof.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a JSON frame.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
