//! # Node Runtime Library
//!
//! Everything `main.rs` wires together, exposed for integration tests.
//!
//! ## Tasks
//!
//! ```text
//!                 ┌──────────────┐  NetworkEvent   ┌──────────────┐
//!   TCP peers ──→ │    Swarm     │ ──────────────→ │ network task │──→ Reconciler
//!                 └──────────────┘                 └──────────────┘        │
//!                        ↑ announce / compareState                          ↓
//!                 ┌──────────────┐                                  SharedLedger
//!                 │  cycle task  │ ── scan / mine / commit ──────────────→ │
//!                 └──────────────┘                                          │
//!   stdin ──→ input task ── mine + submit ─────────────────────────────────┘
//! ```
//!
//! Every task shares one lock-protected ledger handle; none of them blocks
//! another for longer than a single ledger operation.

pub mod config;
pub mod input;
pub mod node;

pub use config::{ConfigError, NodeConfig};
pub use node::Node;
