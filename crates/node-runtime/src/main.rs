//! # B2DB Node
//!
//! Runs one node until Ctrl+C. See [`node_runtime::NodeConfig`] for the
//! `B2_*` environment variables.

use anyhow::{Context, Result};
use node_runtime::{input, Node, NodeConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let result = runtime.block_on(run());
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run() -> Result<()> {
    let config = NodeConfig::from_env().context("Invalid configuration")?;
    let interactive = config.interactive;

    let node = Arc::new(Node::start(config).await?);

    if interactive {
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            info!("Reading instructions from stdin, one per line");
            let stored = input::run(&node, BufReader::new(tokio::io::stdin())).await;
            info!("Input closed after {} submissions", stored);
        });
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await;
    Ok(())
}
