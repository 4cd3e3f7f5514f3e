use b2_01_state_machine::StateError;
use b2_03_ledger::LedgerError;
use shared_types::{BlockHeight, Hash};
use thiserror::Error;

/// Why a peer block was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejection {
    #[error("block hash does not commit to its data")]
    BadCommitment,

    #[error("insufficient work: {found} leading zeros, need {required}")]
    InsufficientWork { required: u32, found: u32 },

    #[error("undecodable block body: {0}")]
    MalformedBody(String),

    #[error("prev {found:?} does not extend head {expected:?} at height {height}")]
    Mislinked {
        height: BlockHeight,
        expected: Hash,
        found: Hash,
    },

    #[error("transaction {0} is already on chain")]
    AlreadyOnChain(Hash),

    #[error("transaction {hash} rejected: {source}")]
    Transaction {
        hash: Hash,
        #[source]
        source: StateError,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("block rejected: {0}")]
    Rejected(#[from] BlockRejection),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ProtocolError {
    /// True for failures caused by the peer's payload rather than local state.
    pub fn is_peer_fault(&self) -> bool {
        match self {
            ProtocolError::Malformed(_) | ProtocolError::Rejected(_) => true,
            ProtocolError::Ledger(e) => matches!(
                e,
                LedgerError::InvalidBlock(_) | LedgerError::InvalidKey(_) | LedgerError::Rejected(_)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_fault_classification() {
        assert!(ProtocolError::Malformed("x".into()).is_peer_fault());
        assert!(ProtocolError::from(BlockRejection::BadCommitment).is_peer_fault());
        assert!(!ProtocolError::from(LedgerError::StorageUnavailable("disk".into())).is_peer_fault());
        assert!(ProtocolError::from(LedgerError::InvalidKey("../x".into())).is_peer_fault());
    }
}
