//! # b2-02-proof-of-work
//!
//! Seals a payload by searching for a nonce whose commitment starts with
//! `difficulty` hex zeros, and scores hashes by the work they represent.
//!
//! ## Search
//!
//! Nonces are tried in order from 0. The search is deterministic: the same
//! payload and difficulty always return the same nonce. Every
//! [`CANCEL_CHECK_INTERVAL`] attempts the cancel flag is polled, so a node can
//! abandon a seal on shutdown.
//!
//! ## Work Estimate
//!
//! [`estimated_work_for`] is the number of attempts after which a hash with
//! the same number of leading zeros would have been found with 50%
//! probability: `ceil(ln 0.5 / ln(1 - 16^-z))`.

pub mod error;
pub mod miner;
pub mod work;

pub use error::PowError;
pub use miner::{meets_difficulty, mine, mine_cancellable};
pub use work::{estimated_work_for, expected_attempts};

/// Difficulty used for transactions and blocks unless configured otherwise.
pub const DEFAULT_DIFFICULTY: u32 = 5;

/// A SHA-256 hex digest has 64 digits.
pub const MAX_DIFFICULTY: u32 = 64;

/// Attempts between two polls of the cancel flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;
