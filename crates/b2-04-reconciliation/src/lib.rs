//! # b2-04-reconciliation
//!
//! Brings two nodes to the same chain and mempool view by trading summaries.
//!
//! ```text
//! Node A                                   Node B
//!   │ ── compareState{blockNumber: 3, ..} ──→ │
//!   │                                         │ local height 5
//!   │ ←── announce{block: #4}                 │
//!   │ ←── announce{block: #5}                 │
//!   │ ←── announce{tx} per missing hash       │
//! ```
//!
//! The reconciler keeps no state of its own; every decision reads the shared
//! ledger. Rejected blocks and transactions are logged and published on the
//! event bus, never answered.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod service;

pub use domain::validation::validate_block;
pub use error::{BlockRejection, ProtocolError};
pub use service::{AnnounceOutcome, Reconciler};
