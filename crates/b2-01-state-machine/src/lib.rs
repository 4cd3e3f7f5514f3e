//! # b2-01-state-machine
//!
//! Replicated table state for B2DB.
//!
//! ## Role in System
//!
//! - **Single Source of Truth**: owns every table row and every applied
//!   instruction hash, split into the `mainnet` and `mempool` spaces.
//! - **Deterministic**: the same sequence of instructions always produces the
//!   same tables; nothing here reads the clock, the disk or the network.
//! - **Commitment Checked**: an instruction whose hash does not match
//!   `digest(data ++ nonce)` never touches a table.
//!
//! ## Application Pipeline
//!
//! ```text
//! VerifiedInstruction
//!        │
//!        ├─ commitment check ──────→ InvalidHash
//!        ├─ INSERT INTO parse ─────→ UnknownInstructionForm
//!        ├─ column/value zip ──────→ MalformedColumns
//!        ├─ applied-hash lookup ───→ DuplicateInstruction
//!        ↓
//!   Commit: create table lazily, append row + hash
//!   DryRun: nothing mutated
//! ```

pub mod domain;

pub use domain::*;
