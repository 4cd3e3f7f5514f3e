//! # Hash Commitment
//!
//! SHA-256 based commitment binding an instruction's data and nonce to its
//! declared identity hash.

use sha2::{Digest, Sha256};

use crate::HASH_HEX_LEN;

/// Compute the lowercase hex SHA-256 digest of `data`.
#[inline]
pub fn digest(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Commitment of `data` and `nonce`: `digest(data ++ decimal(nonce))`.
pub fn commitment(data: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Number of leading `'0'` hex digits in `hash`.
#[inline]
pub fn leading_zero_digits(hash: &str) -> u32 {
    hash.bytes().take_while(|b| *b == b'0').count() as u32
}

/// True if `s` looks like a digest produced by [`digest`].
///
/// Store records are keyed by hash, so anything else is refused as a key.
pub fn is_well_formed_hash(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Leading characters of `hash` shown in log lines.
pub const SHORT_HASH_CHARS: usize = 12;

/// Log-line prefix of `hash`, cut on a char boundary.
///
/// Peers pick the hashes they announce, so the input is not assumed to be hex.
pub fn short_hex(hash: &str) -> &str {
    hash.char_indices()
        .nth(SHORT_HASH_CHARS)
        .map_or(hash, |(end, _)| &hash[..end])
}
