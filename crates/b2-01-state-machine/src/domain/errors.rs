use shared_types::Hash;
use thiserror::Error;

/// Reasons an instruction is refused by the state machine.
///
/// None of these are retried: the scanning loop discards the offending
/// mempool entry and peers are never told.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid hash: declared {declared}, computed {computed}")]
    InvalidHash { declared: Hash, computed: Hash },

    #[error("Unknown instruction form: {0}")]
    UnknownInstructionForm(String),

    #[error("Malformed columns: {0}")]
    MalformedColumns(String),

    #[error("Duplicate instruction {hash} for table {table}")]
    DuplicateInstruction { table: String, hash: Hash },
}
