//! Outbound ports shared across subsystems.

/// Fire-and-forget broadcast to every connected peer.
///
/// At-most-once per call; no acknowledgement is expected. Returns the number
/// of peers the frame was handed to.
pub trait Broadcaster: Send + Sync {
    /// Hand `frame` to every connected peer.
    fn broadcast(&self, frame: &[u8]) -> usize;
}

/// Broadcaster that drops every frame. Used when a node runs without peers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast(&self, _frame: &[u8]) -> usize {
        0
    }
}
