//! # Node
//!
//! Owns the shared ledger handle and the tasks around it.
//!
//! ## Startup Sequence
//!
//! 1. Open the block and mempool stores, replaying the chain
//! 2. Join the swarm on the configured topic
//! 3. Start the network task (frames → reconciler → replies)
//! 4. Start the event log task
//! 5. Start the ledger cycle

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use b2_02_proof_of_work::mine_cancellable;
use b2_03_ledger::{FsBlockStore, FsMempoolStore, Ledger, LedgerService, SharedLedger};
use b2_04_reconciliation::Reconciler;
use b2_05_peer_network::{NetworkEvent, Swarm};
use parking_lot::Mutex;
use shared_bus::{EventFilter, InMemoryEventBus, LedgerEvent, Subscription};
use shared_types::{short_hex, PeerMessage, VerifiedInstruction};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Node {
    config: NodeConfig,
    ledger: SharedLedger,
    event_bus: Arc<InMemoryEventBus>,
    service: Arc<LedgerService>,
    reconciler: Arc<Reconciler>,
    swarm: Arc<Swarm>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub async fn start(config: NodeConfig) -> Result<Self> {
        info!("===========================================");
        info!("  B2DB Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let ledger = open_ledger(&config)
            .context("Failed to open ledger")?
            .into_shared();
        let event_bus = Arc::new(InMemoryEventBus::new());

        let (swarm, network_events) = Swarm::join(config.network.clone())
            .await
            .context("Failed to join swarm")?;
        let swarm = Arc::new(swarm);

        let service = Arc::new(LedgerService::new(
            Arc::clone(&ledger),
            swarm.clone(),
            Arc::clone(&event_bus),
        ));
        let reconciler = Arc::new(
            Reconciler::new(Arc::clone(&ledger)).with_event_bus(Arc::clone(&event_bus)),
        );
        let (shutdown_tx, _) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(network_loop(
                Arc::clone(&swarm),
                Arc::clone(&reconciler),
                Arc::clone(&event_bus),
                network_events,
                shutdown_tx.subscribe(),
            )),
            tokio::spawn(log_events(
                event_bus.subscribe(EventFilter::all()),
                shutdown_tx.subscribe(),
            )),
        ];

        service.start();

        {
            let ledger = ledger.lock();
            info!("Height: {}", ledger.height());
            info!("P2P: {}", swarm.local_addr());
            info!("Data Dir: {:?}", config.data_dir);
        }

        Ok(Self {
            config,
            ledger,
            event_bus,
            service,
            reconciler,
            swarm,
            shutdown_tx,
            tasks: Mutex::new(tasks),
        })
    }

    /// Mine `instruction` at the ledger difficulty and submit it.
    ///
    /// `Ok(None)` when the same instruction is already pending.
    pub async fn submit(&self, instruction: &str) -> Result<Option<VerifiedInstruction>> {
        let data = instruction.trim().to_string();
        let difficulty = self.ledger.lock().config().difficulty;
        let cancel = self.service.cancel_flag();

        let tx = tokio::task::spawn_blocking(move || mine_cancellable(&data, difficulty, &cancel))
            .await
            .context("Mining task failed")??;

        let stored = self.service.submit(tx.clone()).await?;
        Ok(stored.then_some(tx))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.event_bus
    }

    pub fn service(&self) -> &Arc<LedgerService> {
        &self.service
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.swarm.local_addr()
    }

    pub fn peer_count(&self) -> usize {
        self.swarm.peer_count()
    }

    /// Connect to another node.
    pub async fn connect(&self, addr: SocketAddr) -> Result<()> {
        self.swarm
            .dial(addr)
            .await
            .with_context(|| format!("Failed to connect to {addr}"))?;
        Ok(())
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Cancel mining and stop the cycle task
    /// 2. Signal the network and event log tasks
    /// 3. Close every peer connection
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        self.service.stop().await;
        self.shutdown_tx.send_replace(true);
        self.swarm.shutdown();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
                warn!("Task did not stop in time");
            }
        }

        info!("Shutdown complete");
    }
}

fn open_ledger(config: &NodeConfig) -> b2_03_ledger::Result<Ledger> {
    match &config.data_dir {
        Some(dir) => Ledger::open(
            config.ledger.clone(),
            Box::new(FsBlockStore::open(dir)?),
            Box::new(FsMempoolStore::open(dir)?),
        ),
        None => Ledger::in_memory(config.ledger.clone()),
    }
}

async fn network_loop(
    swarm: Arc<Swarm>,
    reconciler: Arc<Reconciler>,
    event_bus: Arc<InMemoryEventBus>,
    mut events: mpsc::Receiver<NetworkEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.changed() => break,
        };
        handle_network_event(&swarm, &reconciler, &event_bus, event);
    }
    info!("[b2-05] Network task stopped");
}

fn handle_network_event(
    swarm: &Swarm,
    reconciler: &Reconciler,
    event_bus: &InMemoryEventBus,
    event: NetworkEvent,
) {
    match event {
        NetworkEvent::Connected(id) => {
            event_bus.emit(LedgerEvent::PeerConnected { connection_id: id });
            match reconciler.on_connection() {
                Ok(handshake) => send(swarm, id, &handshake),
                Err(e) => warn!(connection = id, error = %e, "[b2-04] Could not build summary"),
            }
        }
        NetworkEvent::Data(id, frame) => {
            for reply in reconciler.handle_frame(&frame) {
                send(swarm, id, &reply);
            }
        }
        NetworkEvent::Disconnected(id) => {
            event_bus.emit(LedgerEvent::PeerDisconnected { connection_id: id });
        }
    }
}

fn send(swarm: &Swarm, id: u64, message: &PeerMessage) {
    if let Err(e) = swarm.send_to(id, &message.to_bytes()) {
        debug!(connection = id, error = %e, "[b2-05] Reply dropped");
    }
}

async fn log_events(mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
    loop {
        let event = tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        match &event {
            LedgerEvent::CriticalError {
                subsystem_id,
                error,
            } => error!("[b2-0{}] ❌ CRITICAL: {}", subsystem_id, error),
            LedgerEvent::TransactionDiscarded { hash, reason } => {
                info!("[b2-03] 🗑️  Discarded {}: {}", short_hex(hash), reason)
            }
            LedgerEvent::PeerBlockRejected { hash, reason } => {
                info!("[b2-04] 🚫 Rejected peer block {}: {}", short_hex(hash), reason)
            }
            LedgerEvent::MintSkipped {
                cumulative_work,
                threshold,
            } => debug!(
                "[b2-03] Not minting: accumulated work {} does not exceed {}",
                cumulative_work, threshold
            ),
            other => debug!(event = ?other, source = other.source_subsystem(), "Event"),
        }
    }
}
