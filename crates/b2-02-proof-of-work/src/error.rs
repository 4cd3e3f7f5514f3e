use thiserror::Error;

/// Proof-of-work errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PowError {
    #[error("Difficulty {requested} out of range (max {max})")]
    DifficultyOutOfRange { requested: u32, max: u32 },

    #[error("Nonce space exhausted without meeting difficulty {difficulty}")]
    NonceSpaceExhausted { difficulty: u32 },

    #[error("Mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}
