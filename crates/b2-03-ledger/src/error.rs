//! Error types for the ledger

use b2_01_state_machine::StateError;
use b2_02_proof_of_work::PowError;
use shared_types::{BlockHeight, Hash};
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while ingesting, scanning or minting
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Block or mempool store read/write failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored record could not be decoded
    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord {
        /// Store key (height or hash)
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Persisted blocks do not form a chain
    #[error("Chain broken at height {height}: {reason}")]
    ChainBroken {
        /// Offending height
        height: BlockHeight,
        /// What did not line up
        reason: String,
    },

    /// The head moved while a candidate was being mined
    #[error("Stale candidate: built on {expected_prev}, head is now {head}")]
    StaleCandidate {
        /// Parent the candidate was built on
        expected_prev: Hash,
        /// Current head
        head: Hash,
    },

    /// A block failed commitment, difficulty or linkage checks
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Proof-of-work search failed
    #[error("Mining failed: {0}")]
    Mining(#[from] PowError),

    /// The state machine refused an instruction
    #[error("Rejected: {0}")]
    Rejected(#[from] StateError),

    /// A store key is not a well-formed hash
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Check if error is recoverable (abort this cycle, retry next tick)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::StaleCandidate { .. } | Self::CorruptRecord { .. }
        )
    }

    /// Check if error is critical (node state can no longer be trusted)
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::ChainBroken { .. } | Self::InvalidConfig(_) | Self::Internal(_)
        )
    }

    /// True when mining was abandoned through the cancel flag
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Mining(PowError::Cancelled { .. }))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}
