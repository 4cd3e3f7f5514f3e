//! # Reconciliation Flows
//!
//! Two ledgers exchanging `compareState` / `announce` frames as bytes,
//! exactly as the network task would deliver them, minus the sockets.

use b2_04_reconciliation::Reconciler;

/// One full anti-entropy round: each side sends its summary, the other
/// answers, and the answers are applied. Returns the number of replies.
pub fn sync_round(a: &Reconciler, b: &Reconciler) -> usize {
    let mut delivered = 0;
    for (from, to) in [(a, b), (b, a)] {
        let summary = from
            .summary_message()
            .unwrap_or_else(|e| panic!("summary: {e}"))
            .to_bytes();
        for reply in to.handle_frame(&summary) {
            delivered += 1;
            from.handle_frame(&reply.to_bytes());
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use b2_01_state_machine::Space;
    use b2_03_ledger::{CycleOutcome, SharedLedger};
    use b2_04_reconciliation::Reconciler;
    use proptest::prelude::*;
    use shared_types::{BlockBody, PeerMessage, VerifiedInstruction};

    use super::sync_round;
    use crate::integration::{file_tx, shared_ledger};

    fn mint_blocks(ledger: &SharedLedger, prefix: &str, count: usize) {
        let mut ledger = ledger.lock();
        for i in 0..count {
            ledger.submit(&file_tx(&format!("{prefix}-{i}"), 1)).unwrap();
            assert!(matches!(ledger.run_cycle().unwrap(), CycleOutcome::Minted(_)));
        }
    }

    fn pending(ledger: &SharedLedger) -> BTreeSet<String> {
        ledger.lock().pending_hashes().unwrap().into_iter().collect()
    }

    #[test]
    fn test_follower_catches_up_in_one_round() {
        let miner = shared_ledger(0);
        let follower = shared_ledger(u64::MAX);
        mint_blocks(&miner, "f", 5);

        let a = Reconciler::new(miner.clone());
        let b = Reconciler::new(follower.clone());
        assert_eq!(sync_round(&a, &b), 5);

        let (miner, follower) = (miner.lock(), follower.lock());
        assert_eq!(follower.height(), 4);
        assert_eq!(follower.head_hash(), miner.head_hash());
        assert_eq!(
            follower.state().space(Space::Mainnet),
            miner.state().space(Space::Mainnet)
        );
    }

    #[test]
    fn test_mempools_converge_and_go_quiet() {
        let left = shared_ledger(u64::MAX);
        let right = shared_ledger(u64::MAX);
        left.lock().submit(&file_tx("left", 1)).unwrap();
        right.lock().submit(&file_tx("right", 1)).unwrap();

        let a = Reconciler::new(left.clone());
        let b = Reconciler::new(right.clone());
        assert_eq!(sync_round(&a, &b), 2);
        assert_eq!(pending(&left), pending(&right));
        assert_eq!(pending(&left).len(), 2);

        assert_eq!(sync_round(&a, &b), 0);
    }

    #[test]
    fn test_merged_block_clears_pending_copy() {
        let miner = shared_ledger(0);
        let follower = shared_ledger(u64::MAX);
        let tx = file_tx("shared", 1);
        miner.lock().submit(&tx).unwrap();

        let a = Reconciler::new(miner.clone());
        let b = Reconciler::new(follower.clone());
        sync_round(&a, &b);
        assert!(pending(&follower).contains(&tx.hash));

        assert!(miner.lock().run_cycle().unwrap().minted().is_some());
        sync_round(&a, &b);

        let follower = follower.lock();
        assert_eq!(follower.height(), 0);
        assert!(follower.is_on_chain(&tx.hash));
        assert!(follower.pending_hashes().unwrap().is_empty());
    }

    #[test]
    fn test_forged_block_is_dropped_and_counted() {
        let miner = shared_ledger(0);
        let victim = shared_ledger(u64::MAX);
        mint_blocks(&miner, "f", 1);

        let genesis = miner.lock().block_at(0).unwrap().unwrap();
        let mut body = BlockBody::decode(&genesis.data).unwrap();
        body.transactions[0].data = body.transactions[0].data.replace("f-0", "evil");
        let forged = b2_02_proof_of_work::mine(&body.encode().unwrap(), 1).unwrap();

        let b = Reconciler::new(victim.clone());
        b.handle_frame(&PeerMessage::announce_block(forged).to_bytes());

        let victim = victim.lock();
        assert_eq!(victim.height(), -1);
        assert_eq!(victim.metrics().blocks_merged(), 0);
    }

    #[test]
    fn test_announce_with_block_and_tx() {
        let miner = shared_ledger(0);
        let follower = shared_ledger(u64::MAX);
        mint_blocks(&miner, "f", 1);
        let genesis = miner.lock().block_at(0).unwrap().unwrap();
        let extra = file_tx("extra", 1);

        let b = Reconciler::new(follower.clone());
        let frame = PeerMessage::Announce {
            block: Some(genesis),
            tx: Some(extra.clone()),
        };
        assert!(b.handle_frame(&frame.to_bytes()).is_empty());

        let follower = follower.lock();
        assert_eq!(follower.height(), 0);
        assert_eq!(follower.pending(&extra.hash).unwrap(), Some(extra));
    }

    #[test]
    fn test_legacy_summary_field_is_understood() {
        let local = shared_ledger(u64::MAX);
        let tx = file_tx("a", 1);
        local.lock().submit(&tx).unwrap();

        let frame = serde_json::json!({
            "type": "compareState",
            "blockNumber": -1,
            "mempoolTransactions": [tx.hash],
        });
        let replies = Reconciler::new(local).handle_frame(frame.to_string().as_bytes());
        assert!(replies.is_empty());
    }

    fn local_fixture(blocks: usize, pending: usize) -> (SharedLedger, Vec<VerifiedInstruction>) {
        let ledger = shared_ledger(0);
        mint_blocks(&ledger, "chain", blocks);
        let txs: Vec<_> = (0..pending).map(|i| file_tx(&format!("pending-{i}"), 1)).collect();
        {
            let mut guard = ledger.lock();
            for tx in &txs {
                guard.submit(tx).unwrap();
            }
        }
        (ledger, txs)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_replies_cover_exactly_what_the_peer_lacks(
            blocks in 0usize..4,
            pending in 0usize..4,
            peer_height in -1i64..5,
            known_mask in 0u8..16,
        ) {
            let (ledger, txs) = local_fixture(blocks, pending);
            let known: BTreeSet<String> = txs
                .iter()
                .enumerate()
                .filter(|(i, _)| known_mask & (1 << i) != 0)
                .map(|(_, tx)| tx.hash.clone())
                .collect();

            let replies = Reconciler::new(ledger.clone())
                .compare_state(peer_height, &known)
                .unwrap();

            let local_height = blocks as i64 - 1;
            let expected_blocks = (local_height - peer_height).max(0) as usize;
            prop_assert_eq!(replies.len(), expected_blocks + pending - known.len());

            let ledger = ledger.lock();
            for (offset, reply) in replies.iter().take(expected_blocks).enumerate() {
                let height = peer_height + 1 + offset as i64;
                let expected = ledger.block_at(height).unwrap().unwrap();
                prop_assert_eq!(reply, &PeerMessage::announce_block(expected));
            }
            for reply in replies.iter().skip(expected_blocks) {
                match reply {
                    PeerMessage::Announce { block: None, tx: Some(tx) } => {
                        prop_assert!(!known.contains(&tx.hash));
                    }
                    other => prop_assert!(false, "unexpected reply {:?}", other),
                }
            }
        }
    }
}
