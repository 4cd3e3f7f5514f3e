//! Swarm configuration

use crate::topic::Topic;
use crate::{DEFAULT_EVENT_QUEUE, DEFAULT_OUTBOUND_QUEUE, MAX_FRAME_LEN};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to accept peers on; port 0 picks a free port
    pub listen_addr: SocketAddr,

    /// Peers dialed on join
    pub peers: Vec<SocketAddr>,

    /// Shard topic exchanged in the handshake
    pub topic: Topic,

    pub handshake_timeout_secs: u64,

    pub outbound_queue: usize,

    pub event_queue: usize,

    pub max_frame_len: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 7420)),
            peers: Vec::new(),
            topic: Topic::default(),
            handshake_timeout_secs: 5,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            event_queue: DEFAULT_EVENT_QUEUE,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl NetworkConfig {
    /// Loopback listener on a free port, for tests and local demos.
    pub fn local() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }
}
