use crate::swarm::ConnectionId;
use thiserror::Error;

/// Network errors. All are transient: they end one connection attempt, not the swarm.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("topic mismatch: expected {expected}, peer sent {found}")]
    TopicMismatch { expected: String, found: String },

    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("frame of {len} bytes exceeds {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("unknown connection {0}")]
    UnknownPeer(ConnectionId),

    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),
}
