//! Nonce search.

use crate::{PowError, CANCEL_CHECK_INTERVAL, MAX_DIFFICULTY};
use sha2::{Digest, Sha256};
use shared_types::{leading_zero_digits, VerifiedInstruction};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// True if `hash` starts with at least `difficulty` `'0'` hex digits.
#[inline]
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    leading_zero_digits(hash) >= difficulty
}

/// Seal `payload` at `difficulty`. Runs until a nonce is found.
pub fn mine(payload: &str, difficulty: u32) -> Result<VerifiedInstruction, PowError> {
    mine_cancellable(payload, difficulty, &AtomicBool::new(false))
}

/// Seal `payload` at `difficulty`, giving up once `cancel` is set.
#[tracing::instrument(skip(payload, cancel), fields(payload_len = payload.len()))]
pub fn mine_cancellable(
    payload: &str,
    difficulty: u32,
    cancel: &AtomicBool,
) -> Result<VerifiedInstruction, PowError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(PowError::DifficultyOutOfRange {
            requested: difficulty,
            max: MAX_DIFFICULTY,
        });
    }

    debug!(difficulty, "Starting PoW search");

    // The payload prefix is hashed once; each attempt only adds the nonce digits.
    let mut prefix = Sha256::new();
    prefix.update(payload.as_bytes());
    let mut digits = [0u8; 20];
    let mut nonce: u64 = 0;

    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            debug!(attempts = nonce, "PoW search cancelled");
            return Err(PowError::Cancelled { attempts: nonce });
        }

        let mut hasher = prefix.clone();
        hasher.update(decimal(nonce, &mut digits));
        let hash = hasher.finalize();

        if leading_zero_nibbles(&hash) >= difficulty {
            info!(nonce, difficulty, "PoW search successful");
            return Ok(VerifiedInstruction {
                data: payload.to_string(),
                nonce,
                hash: hex::encode(hash),
            });
        }

        nonce = nonce
            .checked_add(1)
            .ok_or(PowError::NonceSpaceExhausted { difficulty })?;
    }
}

/// ASCII decimal digits of `n`, written into the tail of `buf`.
fn decimal(mut n: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[i..]
}

fn leading_zero_nibbles(bytes: &[u8]) -> u32 {
    let mut count = 0;
    for b in bytes {
        if *b == 0 {
            count += 2;
            continue;
        }
        if b >> 4 == 0 {
            count += 1;
        }
        break;
    }
    count
}
