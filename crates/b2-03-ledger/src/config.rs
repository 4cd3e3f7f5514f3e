//! Configuration types for the ledger

use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Runtime configuration for the ledger
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Cumulative estimated work that must be exceeded before a block is cut
    pub work_threshold: u64,

    /// Leading hex zeros required of block hashes (and of local submissions)
    pub difficulty: u32,

    /// Seconds between two scan/mint cycles
    pub cycle_interval_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            work_threshold: crate::DEFAULT_WORK_THRESHOLD,
            difficulty: b2_02_proof_of_work::DEFAULT_DIFFICULTY,
            cycle_interval_secs: crate::DEFAULT_CYCLE_INTERVAL_SECS,
        }
    }
}

impl LedgerConfig {
    /// Interval between cycles
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs.max(1))
    }

    /// Reject values the miner cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > b2_02_proof_of_work::MAX_DIFFICULTY {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty {} exceeds {}",
                self.difficulty,
                b2_02_proof_of_work::MAX_DIFFICULTY
            )));
        }
        Ok(())
    }
}
