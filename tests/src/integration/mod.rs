//! Cross-crate flows.

pub mod convergence;
pub mod e2e_genesis;
pub mod flows;

use b2_02_proof_of_work::mine;
use b2_03_ledger::{Ledger, LedgerConfig, SharedLedger};
use shared_types::VerifiedInstruction;

/// Ledger config with cheap blocks: difficulty 1, one-second cycles.
pub fn quick_ledger_config(work_threshold: u64) -> LedgerConfig {
    LedgerConfig {
        work_threshold,
        difficulty: 1,
        cycle_interval_secs: 1,
    }
}

pub fn shared_ledger(work_threshold: u64) -> SharedLedger {
    Ledger::in_memory(quick_ledger_config(work_threshold))
        .map(Ledger::into_shared)
        .unwrap_or_else(|e| panic!("in-memory ledger: {e}"))
}

/// `INSERT INTO files` row for `name`, mined at `difficulty`.
pub fn file_tx(name: &str, difficulty: u32) -> VerifiedInstruction {
    mine(
        &format!("INSERT INTO files (name, sha256_hash) VALUES ('{name}','abcd')"),
        difficulty,
    )
    .unwrap_or_else(|e| panic!("mining {name}: {e}"))
}
