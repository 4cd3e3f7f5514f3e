//! # B2DB Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs   # PoW, work estimate, scan
//! └── src/integration/
//!     ├── e2e_genesis.rs         # empty chain → genesis → peer catch-up
//!     ├── flows.rs               # two ledgers reconciling over wire frames
//!     └── convergence.rs         # nodes over real TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p b2-tests
//! cargo test -p b2-tests integration::convergence
//! cargo bench -p b2-tests
//! ```

#![allow(dead_code)]

pub mod integration;
