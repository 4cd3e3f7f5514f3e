//! Peer block admission checks.
//!
//! Checks run cheapest first: commitment, work, body, linkage, then every
//! transaction against a scratch copy of mainnet.

use crate::error::BlockRejection;
use b2_01_state_machine::{apply_to_space, ApplyMode, StateSpace};
use b2_02_proof_of_work::meets_difficulty;
use shared_types::{leading_zero_digits, BlockBody, BlockHeight, VerifiedInstruction, EMPTY_CHAIN_HEIGHT};

/// Validate a block announced by a peer against the local view.
///
/// Linkage is not checked while the local chain is empty. The live `mainnet`
/// space is never touched.
pub fn validate_block(
    block: &VerifiedInstruction,
    known_height: BlockHeight,
    known_head_hash: &str,
    difficulty: u32,
    mainnet: &StateSpace,
) -> Result<BlockBody, BlockRejection> {
    if !block.verify_commitment() {
        return Err(BlockRejection::BadCommitment);
    }
    if !meets_difficulty(&block.hash, difficulty) {
        return Err(BlockRejection::InsufficientWork {
            required: difficulty,
            found: leading_zero_digits(&block.hash),
        });
    }

    let body =
        BlockBody::decode(&block.data).map_err(|e| BlockRejection::MalformedBody(e.to_string()))?;

    if known_height > EMPTY_CHAIN_HEIGHT && body.prev != known_head_hash {
        return Err(BlockRejection::Mislinked {
            height: known_height + 1,
            expected: known_head_hash.to_string(),
            found: body.prev,
        });
    }

    let mut scratch = mainnet.clone();
    for tx in &body.transactions {
        if mainnet.contains_hash(&tx.hash) {
            return Err(BlockRejection::AlreadyOnChain(tx.hash.clone()));
        }
        apply_to_space(&mut scratch, tx, ApplyMode::Commit).map_err(|source| {
            BlockRejection::Transaction {
                hash: tx.hash.clone(),
                source,
            }
        })?;
    }

    Ok(body)
}
