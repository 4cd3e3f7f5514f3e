//! # Reconciler
//!
//! Turns peer frames into ledger operations and summary comparisons into
//! outbound announces. Holds the ledger lock for one frame at a time.

use crate::domain::validation::validate_block;
use crate::error::ProtocolError;
use b2_01_state_machine::Space;
use b2_03_ledger::{MintedBlock, SharedLedger};
use shared_bus::{InMemoryEventBus, LedgerEvent};
use shared_types::{BlockHeight, ChainSummary, Hash, PeerMessage, VerifiedInstruction};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What an `announce` did to the local ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnounceOutcome {
    /// The announced transaction was new and is now pending.
    pub tx_stored: bool,
    /// The announced block extended the local head.
    pub merged: Option<MintedBlock>,
}

pub struct Reconciler {
    ledger: SharedLedger,
    event_bus: Option<Arc<InMemoryEventBus>>,
}

impl Reconciler {
    pub fn new(ledger: SharedLedger) -> Self {
        Self {
            ledger,
            event_bus: None,
        }
    }

    /// Publish merges, rejections and stored transactions on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Local `compareState` message.
    pub fn summary_message(&self) -> Result<PeerMessage, ProtocolError> {
        let summary = self.ledger.lock().summary()?;
        Ok(PeerMessage::compare_state(summary))
    }

    /// Handshake sent to a freshly connected peer.
    pub fn on_connection(&self) -> Result<PeerMessage, ProtocolError> {
        self.summary_message()
    }

    /// Announces for everything the peer lacks: blocks above its height in
    /// ascending order, then local pending transactions absent from its set.
    pub fn compare_state(
        &self,
        peer_block_number: BlockHeight,
        peer_hashes: &BTreeSet<Hash>,
    ) -> Result<Vec<PeerMessage>, ProtocolError> {
        let ledger = self.ledger.lock();

        let mut replies: Vec<PeerMessage> = ledger
            .blocks_after(peer_block_number)?
            .into_iter()
            .map(|(_, block)| PeerMessage::announce_block(block))
            .collect();
        let blocks = replies.len();

        let mut missing = ledger.pending_hashes()?;
        missing.sort();
        for hash in missing {
            if peer_hashes.contains(&hash) {
                continue;
            }
            if let Some(tx) = ledger.pending(&hash)? {
                replies.push(PeerMessage::announce_tx(tx));
            }
        }

        if !replies.is_empty() {
            debug!(
                peer_height = peer_block_number,
                local_height = ledger.height(),
                blocks,
                txs = replies.len() - blocks,
                "[b2-04] Peer is behind, sending announces"
            );
        }
        Ok(replies)
    }

    /// Apply an `announce`. The block and the transaction are independent:
    /// a bad one never stops the other.
    pub fn on_announce(
        &self,
        block: Option<&VerifiedInstruction>,
        tx: Option<&VerifiedInstruction>,
    ) -> AnnounceOutcome {
        let mut outcome = AnnounceOutcome::default();

        if let Some(tx) = tx {
            match self.ledger.lock().store_pending(tx) {
                Ok(stored) => {
                    outcome.tx_stored = stored;
                    if stored {
                        self.emit(LedgerEvent::TransactionStored {
                            hash: tx.hash.clone(),
                            from_peer: true,
                        });
                    }
                }
                Err(e) => debug!(error = %e, "[b2-04] Dropped announced transaction"),
            }
        }

        if let Some(block) = block {
            match self.merge_block(block) {
                Ok(merged) => outcome.merged = merged,
                Err(e) => self.reject_block(block, &e),
            }
        }

        outcome
    }

    /// Validate and merge under one lock. `Ok(None)` when the block is our head.
    fn merge_block(&self, block: &VerifiedInstruction) -> Result<Option<MintedBlock>, ProtocolError> {
        let mut ledger = self.ledger.lock();
        if block.hash == ledger.head_hash() {
            return Ok(None);
        }

        validate_block(
            block,
            ledger.height(),
            ledger.head_hash(),
            ledger.config().difficulty,
            ledger.state().space(Space::Mainnet),
        )?;
        let merged = ledger.accept_peer_block(block)?;
        drop(ledger);

        self.emit(LedgerEvent::PeerBlockMerged {
            height: merged.height,
            hash: merged.block.hash.clone(),
        });
        Ok(Some(merged))
    }

    fn reject_block(&self, block: &VerifiedInstruction, error: &ProtocolError) {
        if error.is_peer_fault() {
            info!(
                hash = block.short_hash(),
                reason = %error,
                "[b2-04] 🚫 Dropped peer block"
            );
        } else {
            warn!(hash = block.short_hash(), error = %error, "[b2-04] Could not merge peer block");
        }

        self.ledger.lock().metrics().record_rejected_block();
        self.emit(LedgerEvent::PeerBlockRejected {
            hash: block.hash.clone(),
            reason: error.to_string(),
        });
    }

    /// Handle one inbound frame and return the replies for its sender.
    ///
    /// Frames that are not a known JSON message are ignored.
    pub fn handle_frame(&self, frame: &[u8]) -> Vec<PeerMessage> {
        let message = match PeerMessage::from_bytes(frame) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, len = frame.len(), "[b2-04] Ignoring non-protocol frame");
                return Vec::new();
            }
        };

        match message {
            PeerMessage::CompareState {
                block_number,
                mempool_transaction_hashes,
            } => match self.compare_state(block_number, &mempool_transaction_hashes) {
                Ok(replies) => replies,
                Err(e) => {
                    warn!(error = %e, "[b2-04] Could not answer compareState");
                    Vec::new()
                }
            },
            PeerMessage::Announce { block, tx } => {
                self.on_announce(block.as_ref(), tx.as_ref());
                Vec::new()
            }
        }
    }

    /// Local summary, for callers that build their own message.
    pub fn summary(&self) -> Result<ChainSummary, ProtocolError> {
        Ok(self.ledger.lock().summary()?)
    }

    fn emit(&self, event: LedgerEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}
