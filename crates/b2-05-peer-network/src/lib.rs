//! # b2-05-peer-network
//!
//! Joins every node that shares a 32-byte topic into one flat swarm.
//!
//! ## Connection lifecycle
//!
//! ```text
//! dial / accept ──→ HELLO <topic-hex> ⇄ HELLO <topic-hex> ──→ Connected(id)
//!                          │ mismatch                              │
//!                          └──→ closed                  Data(id, frame)*
//!                                                                  │
//!                                                         Disconnected(id)
//! ```
//!
//! Outbound frames go through a bounded per-peer queue; a full queue drops
//! the frame. Delivery is at-most-once, duplicates are the protocol's problem.

pub mod config;
pub mod error;
pub mod swarm;
pub mod topic;

pub use config::NetworkConfig;
pub use error::NetworkError;
pub use swarm::{ConnectionId, NetworkEvent, Swarm};
pub use topic::Topic;

/// Largest accepted frame, newline excluded.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frames buffered per peer before broadcasts to it are dropped.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Network events buffered before connection readers wait.
pub const DEFAULT_EVENT_QUEUE: usize = 1024;
