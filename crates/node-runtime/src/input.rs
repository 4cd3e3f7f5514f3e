//! Demo input: one `INSERT INTO` instruction per line.
//!
//! Blank lines and lines starting with `#` are skipped. Each instruction is
//! mined at the ledger difficulty, submitted and announced to peers.

use crate::node::Node;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Read `reader` to the end. Returns the number of newly stored instructions.
pub async fn run<R>(node: &Node, reader: R) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stored = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Input closed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match node.submit(line).await {
            Ok(Some(tx)) => {
                stored += 1;
                info!("[b2-03] ✅ Submitted {} (nonce {})", tx.short_hash(), tx.nonce);
            }
            Ok(None) => info!("[b2-03] Already pending: {}", line),
            Err(e) => warn!("[b2-03] Refused {:?}: {:#}", line, e),
        }
    }

    stored
}
