//! # Shared Bus - Observable Node Events
//!
//! A `tokio::sync::broadcast` backed bus on which the ledger, the
//! reconciliation layer and the network adapter publish what happened:
//! accepted and discarded transactions, skipped mints, minted and merged
//! blocks, peer churn.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ LedgerService│    publish()       │  Log sink /  │
//! │ Reconciler   │ ──────┐            │  tests       │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Rejections are never sent back to the peer that caused them; the bus is
//! where they become observable.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
