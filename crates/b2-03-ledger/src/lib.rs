//! # b2-03-ledger
//!
//! Mempool and chain ledger for B2DB.
//!
//! ## Role in System
//!
//! - **Ingestion**: local submissions are dry-run against mainnet before they
//!   are stored; peer announces are stored as-is and judged at the next scan.
//! - **Admission Control**: each cycle rebuilds the mempool space from mainnet,
//!   applies every pending entry and sums the estimated work of those it
//!   accepted. A block is cut only when that sum exceeds the work threshold.
//! - **Chain Head**: sole owner of the height, the head hash and the set of
//!   transactions already on chain.
//!
//! ## Cycle
//!
//! ```text
//! ┌─────────┐ scan  ┌──────────┐ work > threshold ┌─────────┐ sealed ┌──────────┐
//! │  Idle   │──────→│ Scanning │─────────────────→│ Minting │───────→│ persist, │
//! └─────────┘       └──────────┘                  └─────────┘        │ announce │
//!      ↑                 │ below threshold             │ cancelled   └──────────┘
//!      └─────────────────┴─────────────────────────────┴──────────────────┘
//! ```
//!
//! [`LedgerService`] runs the cycle on a timer, mines on the blocking pool and
//! broadcasts minted blocks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{FsBlockStore, FsMempoolStore};
pub use config::LedgerConfig;
pub use domain::*;
pub use error::{LedgerError, Result};
pub use metrics::LedgerMetrics;
pub use ports::outbound::{BlockStore, InMemoryBlockStore, InMemoryMempoolStore, MempoolStore};
pub use service::LedgerService;

/// Cumulative estimated work that must be exceeded to cut a block.
pub const DEFAULT_WORK_THRESHOLD: u64 = 100_000;

/// Default seconds between scan/mint cycles.
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 5;
