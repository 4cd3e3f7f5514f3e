//! # Shared Types Crate
//!
//! Entities, the hash commitment and the peer wire format used by every
//! B2DB subsystem crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: instruction, block and summary types live here.
//! - **Commitment First**: a [`VerifiedInstruction`] is only trusted after
//!   [`VerifiedInstruction::verify_commitment`] has been checked by the consumer.
//! - **Wire Compatibility**: [`PeerMessage`] serializes to the JSON shape every
//!   node on a shard speaks (`compareState` / `announce`).

pub mod entities;
pub mod hashing;
pub mod ports;
pub mod wire;

pub use entities::*;
pub use hashing::{
    commitment, digest, is_well_formed_hash, leading_zero_digits, short_hex, SHORT_HASH_CHARS,
};
pub use ports::{Broadcaster, NoopBroadcaster};
pub use wire::PeerMessage;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Fixed 32-byte discovery topic shared by all participants of the default shard.
pub const DEFAULT_TOPIC: [u8; 32] = [
    0xb2, 0xdb, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0x00, 0x01,
];
