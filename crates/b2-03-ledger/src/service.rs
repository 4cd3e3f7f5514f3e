//! # Ledger Service
//!
//! Async wrapper that drives the scan/mint cycle on a timer. The ledger lock
//! is held for scanning and committing only; the nonce search runs on the
//! blocking pool over an immutable [`MintCandidate`].

use crate::domain::{CycleOutcome, MintCandidate, MintedBlock, ScanReport, SharedLedger};
use crate::error::{LedgerError, Result};
use crate::metrics::LedgerMetrics;
use b2_02_proof_of_work::{estimated_work_for, mine_cancellable};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, InMemoryEventBus, LedgerEvent};
use shared_types::{Broadcaster, PeerMessage, VerifiedInstruction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// How long [`LedgerService::stop`] waits for the cycle task to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LedgerService {
    ledger: SharedLedger,
    broadcaster: Arc<dyn Broadcaster>,
    event_bus: Arc<InMemoryEventBus>,
    metrics: Arc<LedgerMetrics>,

    /// Polled by the miner; once set, every search gives up.
    cancel: Arc<AtomicBool>,

    is_active: AtomicBool,
    shutdown: watch::Sender<bool>,
    cycle_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LedgerService {
    pub fn new(
        ledger: SharedLedger,
        broadcaster: Arc<dyn Broadcaster>,
        event_bus: Arc<InMemoryEventBus>,
    ) -> Self {
        let metrics = ledger.lock().metrics();
        let (shutdown, _) = watch::channel(false);
        Self {
            ledger,
            broadcaster,
            event_bus,
            metrics,
            cancel: Arc::new(AtomicBool::new(false)),
            is_active: AtomicBool::new(false),
            shutdown,
            cycle_handle: Mutex::new(None),
        }
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    /// Submit a locally sealed instruction and announce it to peers.
    pub async fn submit(&self, tx: VerifiedInstruction) -> Result<bool> {
        let stored = self.ledger.lock().submit(&tx)?;
        if stored {
            self.broadcaster
                .broadcast(&PeerMessage::announce_tx(tx.clone()).to_bytes());
            self.event_bus
                .publish(LedgerEvent::TransactionStored {
                    hash: tx.hash,
                    from_peer: false,
                })
                .await;
        }
        Ok(stored)
    }

    /// Send the local `compareState` to every peer. Returns the peer count.
    pub fn broadcast_summary(&self) -> Result<usize> {
        let summary = self.ledger.lock().summary()?;
        Ok(self
            .broadcaster
            .broadcast(&PeerMessage::compare_state(summary).to_bytes()))
    }

    /// One scan/mint cycle.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let (report, candidate, threshold) = {
            let mut ledger = self.ledger.lock();
            let report = ledger.scan()?;
            let candidate = ledger.prepare_mint(&report)?;
            (report, candidate, ledger.config().work_threshold)
        };
        self.publish_scan(&report).await;

        let Some(candidate) = candidate else {
            self.event_bus
                .publish(LedgerEvent::MintSkipped {
                    cumulative_work: report.cumulative_work,
                    threshold,
                })
                .await;
            return Ok(CycleOutcome::BelowThreshold {
                cumulative_work: report.cumulative_work,
                threshold,
            });
        };

        let sealed = match self.seal(&candidate).await {
            Ok(sealed) => sealed,
            Err(e) => {
                self.ledger.lock().abort_mint();
                return Err(e);
            }
        };

        let minted = self.ledger.lock().commit_block(&candidate, sealed)?;
        self.announce(&minted).await;
        Ok(CycleOutcome::Minted(minted))
    }

    async fn seal(&self, candidate: &MintCandidate) -> Result<VerifiedInstruction> {
        let payload = candidate.payload.clone();
        let difficulty = candidate.difficulty;
        let cancel = Arc::clone(&self.cancel);
        let started = Instant::now();

        let sealed =
            tokio::task::spawn_blocking(move || mine_cancellable(&payload, difficulty, &cancel))
                .await
                .map_err(|e| LedgerError::Internal(format!("mining task failed: {e}")))??;

        let elapsed = started.elapsed();
        self.metrics.record_mining_time(elapsed.as_millis() as u64);
        info!(
            "[b2-03] ⛏️  PoW took {:.2}s (nonce {})",
            elapsed.as_secs_f64(),
            sealed.nonce
        );
        Ok(sealed)
    }

    async fn publish_scan(&self, report: &ScanReport) {
        for tx in &report.accepted {
            self.event_bus
                .publish(LedgerEvent::TransactionAccepted {
                    hash: tx.hash.clone(),
                    work: estimated_work_for(&tx.hash),
                })
                .await;
        }
        for discarded in &report.discarded {
            self.event_bus
                .publish(LedgerEvent::TransactionDiscarded {
                    hash: discarded.hash.clone(),
                    reason: discarded.reason.clone(),
                })
                .await;
        }
    }

    async fn announce(&self, minted: &MintedBlock) {
        let peers = self
            .broadcaster
            .broadcast(&PeerMessage::announce_block(minted.block.clone()).to_bytes());
        info!(
            "[b2-03] 📣 Announced block {} to {} peers",
            minted.height, peers
        );

        if minted.is_genesis() {
            self.event_bus
                .publish(LedgerEvent::GenesisMinted {
                    hash: minted.block.hash.clone(),
                })
                .await;
        }
        self.event_bus
            .publish(LedgerEvent::BlockMinted {
                height: minted.height,
                hash: minted.block.hash.clone(),
                transactions: minted.transactions,
            })
            .await;
    }

    /// Start the cycle task: every interval, broadcast the summary then run a cycle.
    pub fn start(self: &Arc<Self>) {
        if self.is_active.swap(true, Ordering::SeqCst) {
            warn!("[b2-03] Cycle task already running");
            return;
        }

        // A previous stop() leaves both signals raised.
        self.cancel.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(false);

        let interval = self.ledger.lock().config().cycle_interval();
        let service = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            info!("[b2-03] Cycle task started (every {:?})", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }

                if let Err(e) = service.broadcast_summary() {
                    warn!(error = %e, "[b2-03] Could not build summary");
                }

                match service.run_cycle().await {
                    Ok(_) => {}
                    Err(e) if e.is_cancelled() => {
                        info!("[b2-03] Mining cancelled");
                        break;
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, "[b2-03] Cycle aborted, retrying next tick");
                    }
                    Err(e) => {
                        error!(error = %e, "[b2-03] Cycle failed");
                        service
                            .event_bus
                            .publish(LedgerEvent::CriticalError {
                                subsystem_id: 3,
                                error: e.to_string(),
                            })
                            .await;
                    }
                }
            }

            service.is_active.store(false, Ordering::SeqCst);
            info!("[b2-03] Cycle task stopped");
        });

        *self.cycle_handle.lock() = Some(handle);
    }

    /// Stop the cycle task, cancelling any in-flight nonce search.
    pub async fn stop(&self) {
        info!("[b2-03] Stopping ledger cycle");
        self.cancel.store(true, Ordering::SeqCst);
        self.shutdown.send_replace(true);

        let handle = self.cycle_handle.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_TIMEOUT, handle).await.is_err() {
                warn!("[b2-03] Cycle task did not stop in time");
            }
        }
        self.is_active.store(false, Ordering::SeqCst);
    }
}
