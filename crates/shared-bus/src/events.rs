//! # Node Events
//!
//! Everything the core engine reports without failing: shortfalls, discards,
//! genesis, merges and peer churn.

use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, Hash};

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // MEMPOOL
    // =========================================================================
    /// A transaction was persisted into the mempool store.
    TransactionStored {
        /// Transaction hash.
        hash: Hash,
        /// True when it arrived from a peer rather than a local submission.
        from_peer: bool,
    },

    /// A pending transaction was applied to the mempool space this cycle.
    TransactionAccepted {
        /// Transaction hash.
        hash: Hash,
        /// Estimated work credited for it.
        work: u64,
    },

    /// A pending transaction was dropped permanently.
    TransactionDiscarded {
        /// Transaction hash.
        hash: Hash,
        /// Why it was dropped.
        reason: String,
    },

    // =========================================================================
    // CHAIN
    // =========================================================================
    /// Accumulated work did not reach the mint threshold this cycle.
    MintSkipped {
        /// Work accumulated by accepted entries.
        cumulative_work: u64,
        /// Threshold that must be exceeded.
        threshold: u64,
    },

    /// A block was mined locally and persisted.
    BlockMinted {
        /// Assigned height.
        height: BlockHeight,
        /// Block hash.
        hash: Hash,
        /// Number of included transactions.
        transactions: usize,
    },

    /// The first block of the chain was mined locally.
    GenesisMinted {
        /// Genesis block hash.
        hash: Hash,
    },

    /// A block announced by a peer was validated and merged.
    PeerBlockMerged {
        /// Height it was stored at.
        height: BlockHeight,
        /// Block hash.
        hash: Hash,
    },

    /// A block announced by a peer was dropped.
    PeerBlockRejected {
        /// Declared block hash.
        hash: Hash,
        /// Why it was dropped.
        reason: String,
    },

    // =========================================================================
    // NETWORK
    // =========================================================================
    /// A peer connection was established.
    PeerConnected {
        /// Connection identifier.
        connection_id: u64,
    },

    /// A peer connection was closed.
    PeerDisconnected {
        /// Connection identifier.
        connection_id: u64,
    },

    /// Critical error requiring operator attention.
    CriticalError {
        /// Subsystem that encountered the error.
        subsystem_id: u8,
        /// Error description.
        error: String,
    },
}

impl LedgerEvent {
    /// Topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionStored { .. }
            | Self::TransactionAccepted { .. }
            | Self::TransactionDiscarded { .. } => EventTopic::Mempool,
            Self::MintSkipped { .. }
            | Self::BlockMinted { .. }
            | Self::GenesisMinted { .. }
            | Self::PeerBlockMerged { .. }
            | Self::PeerBlockRejected { .. } => EventTopic::Chain,
            Self::PeerConnected { .. } | Self::PeerDisconnected { .. } => EventTopic::Network,
            Self::CriticalError { .. } => EventTopic::Critical,
        }
    }

    /// Subsystem that emits this event.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::PeerBlockMerged { .. } | Self::PeerBlockRejected { .. } => 4,
            Self::PeerConnected { .. } | Self::PeerDisconnected { .. } => 5,
            Self::CriticalError { subsystem_id, .. } => *subsystem_id,
            _ => 3,
        }
    }
}

/// Event topics for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Mempool store and scanning events.
    Mempool,
    /// Chain growth events.
    Chain,
    /// Peer connection events.
    Network,
    /// Errors requiring attention.
    Critical,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
