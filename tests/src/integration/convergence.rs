//! # Network Convergence
//!
//! Full nodes on loopback TCP: announces on submit and mint, catch-up on
//! connect, topic isolation.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use b2_05_peer_network::Topic;
    use node_runtime::{Node, NodeConfig};
    use tokio::time::{sleep, Instant};

    use crate::integration::quick_ledger_config;

    const DEADLINE: Duration = Duration::from_secs(15);

    fn node_config(work_threshold: u64) -> NodeConfig {
        NodeConfig {
            ledger: quick_ledger_config(work_threshold),
            ..NodeConfig::in_memory()
        }
    }

    async fn eventually<F>(what: &str, mut check: F)
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + DEADLINE;
        while !check() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_follower_receives_tx_and_block() {
        let miner = Node::start(node_config(0)).await.unwrap();
        let mut follower_config = node_config(u64::MAX);
        follower_config.network.peers = vec![miner.local_addr()];
        let follower = Node::start(follower_config).await.unwrap();

        eventually("connection", || miner.peer_count() == 1 && follower.peer_count() == 1).await;

        let tx = miner
            .submit("INSERT INTO files (name, sha256_hash) VALUES ('app.ipa','abcd')")
            .await
            .unwrap()
            .unwrap();

        eventually("follower to merge genesis", || {
            follower.ledger().lock().height() == 0
        })
        .await;

        {
            let (miner, follower) = (miner.ledger().lock(), follower.ledger().lock());
            assert_eq!(follower.head_hash(), miner.head_hash());
            assert!(follower.is_on_chain(&tx.hash));
            assert!(follower.pending_hashes().unwrap().is_empty());
        }

        follower.shutdown().await;
        miner.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_late_joiner_catches_up_on_connect() {
        let miner = Node::start(node_config(0)).await.unwrap();
        for name in ["a", "b"] {
            miner
                .submit(&format!("INSERT INTO files (name) VALUES ('{name}')"))
                .await
                .unwrap();
            let target = if name == "a" { 0 } else { 1 };
            eventually("miner to mint", || miner.ledger().lock().height() >= target).await;
        }

        let late = Node::start(node_config(u64::MAX)).await.unwrap();
        late.connect(miner.local_addr()).await.unwrap();

        eventually("late joiner to catch up", || {
            late.ledger().lock().height() == miner.ledger().lock().height()
        })
        .await;
        assert_eq!(
            late.ledger().lock().head_hash(),
            miner.ledger().lock().head_hash()
        );

        late.shutdown().await;
        miner.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pending_entries_spread_both_ways() {
        let left = Node::start(node_config(u64::MAX)).await.unwrap();
        let right = Node::start(node_config(u64::MAX)).await.unwrap();
        right.connect(left.local_addr()).await.unwrap();

        let a = left
            .submit("INSERT INTO notes (body) VALUES ('from left')")
            .await
            .unwrap()
            .unwrap();
        let b = right
            .submit("INSERT INTO notes (body) VALUES ('from right')")
            .await
            .unwrap()
            .unwrap();

        eventually("mempools to converge", || {
            let l = left.ledger().lock().pending_hashes().unwrap_or_default();
            let r = right.ledger().lock().pending_hashes().unwrap_or_default();
            l.len() == 2 && r.len() == 2
        })
        .await;
        assert!(left.ledger().lock().pending(&b.hash).unwrap().is_some());
        assert!(right.ledger().lock().pending(&a.hash).unwrap().is_some());

        right.shutdown().await;
        left.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_other_topic_is_refused() {
        let node = Node::start(node_config(u64::MAX)).await.unwrap();
        let mut stranger_config = node_config(u64::MAX);
        stranger_config.network.topic = Topic::new([0x42; 32]);
        let stranger = Node::start(stranger_config).await.unwrap();

        assert!(stranger.connect(node.local_addr()).await.is_err());
        sleep(Duration::from_millis(200)).await;
        assert_eq!(node.peer_count(), 0);
        assert_eq!(stranger.peer_count(), 0);

        stranger.shutdown().await;
        node.shutdown().await;
    }
}
