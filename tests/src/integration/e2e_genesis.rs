//! # End-to-End: Genesis
//!
//! Empty chain → enough accepted work → block 0 → a fresh peer catches up
//! with exactly one block announce.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use b2_01_state_machine::Space;
    use b2_02_proof_of_work::{estimated_work_for, mine};
    use b2_03_ledger::{
        CycleOutcome, Ledger, LedgerConfig, LedgerService, DEFAULT_WORK_THRESHOLD,
    };
    use b2_04_reconciliation::Reconciler;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, LedgerEvent};
    use shared_types::{BlockBody, NoopBroadcaster, PeerMessage};

    use crate::integration::{file_tx, quick_ledger_config, shared_ledger};

    const APP_IPA: &str = "INSERT INTO files (name, sha256_hash) VALUES ('app.ipa','abcd')";

    #[test]
    fn test_difficulty_five_instruction_mints_genesis() {
        let ledger = shared_ledger(DEFAULT_WORK_THRESHOLD);
        let tx = mine(APP_IPA, 5).unwrap();
        assert!(tx.hash.starts_with("00000"));
        assert!(estimated_work_for(&tx.hash) > DEFAULT_WORK_THRESHOLD);

        assert!(ledger.lock().submit(&tx).unwrap());
        let minted = match ledger.lock().run_cycle().unwrap() {
            CycleOutcome::Minted(minted) => minted,
            other => panic!("expected genesis, got {other:?}"),
        };

        assert!(minted.is_genesis());
        let body = BlockBody::decode(&minted.block.data).unwrap();
        assert_eq!(body.prev, "");
        assert_eq!(body.transactions, vec![tx.clone()]);

        {
            let ledger = ledger.lock();
            assert_eq!(ledger.height(), 0);
            assert!(ledger.pending_hashes().unwrap().is_empty());
            let files = ledger.state().table(Space::Mainnet, "files").unwrap();
            assert_eq!(files.rows[0]["name"], "app.ipa");
            assert_eq!(files.rows[0]["sha256_hash"], "abcd");
        }

        let replies = Reconciler::new(ledger)
            .compare_state(-1, &BTreeSet::new())
            .unwrap();
        assert_eq!(replies, vec![PeerMessage::announce_block(minted.block)]);
    }

    #[test]
    fn test_work_accumulates_until_threshold() {
        let ledger = shared_ledger(DEFAULT_WORK_THRESHOLD);
        let mut included = Vec::new();
        let mut work = 0u64;

        for i in 0.. {
            let tx = file_tx(&format!("app-{i}.ipa"), 4);
            work += estimated_work_for(&tx.hash);
            included.push(tx.clone());
            ledger.lock().submit(&tx).unwrap();

            match ledger.lock().run_cycle().unwrap() {
                CycleOutcome::BelowThreshold {
                    cumulative_work,
                    threshold,
                } => {
                    assert_eq!(cumulative_work, work);
                    assert_eq!(threshold, DEFAULT_WORK_THRESHOLD);
                    assert!(work <= DEFAULT_WORK_THRESHOLD);
                }
                CycleOutcome::Minted(minted) => {
                    assert!(work > DEFAULT_WORK_THRESHOLD);
                    assert!(minted.is_genesis());
                    assert_eq!(minted.transactions, included.len());
                    break;
                }
            }
            assert!(i < 2, "three difficulty-4 entries always exceed the threshold");
        }

        let ledger = ledger.lock();
        assert_eq!(ledger.height(), 0);
        assert!(ledger.pending_hashes().unwrap().is_empty());
        assert!(included.iter().all(|tx| ledger.is_on_chain(&tx.hash)));
    }

    #[tokio::test]
    async fn test_service_reports_genesis_on_the_bus() {
        let ledger = Ledger::in_memory(LedgerConfig {
            work_threshold: DEFAULT_WORK_THRESHOLD,
            ..quick_ledger_config(0)
        })
        .unwrap()
        .into_shared();
        let bus = Arc::new(InMemoryEventBus::new());
        let mut chain = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));
        let service = LedgerService::new(
            Arc::clone(&ledger),
            Arc::new(NoopBroadcaster),
            Arc::clone(&bus),
        );

        let tx = file_tx("small", 1);
        service.submit(tx).await.unwrap();
        service.run_cycle().await.unwrap();
        assert!(matches!(
            chain.try_recv().unwrap(),
            Some(LedgerEvent::MintSkipped { .. })
        ));

        service.submit(mine(APP_IPA, 5).unwrap()).await.unwrap();
        let outcome = service.run_cycle().await.unwrap();
        let minted = outcome.minted().cloned().expect("threshold crossed");

        let events = chain.drain();
        assert_eq!(
            events,
            vec![
                LedgerEvent::GenesisMinted {
                    hash: minted.block.hash.clone()
                },
                LedgerEvent::BlockMinted {
                    height: 0,
                    hash: minted.block.hash,
                    transactions: 2
                },
            ]
        );
    }
}
