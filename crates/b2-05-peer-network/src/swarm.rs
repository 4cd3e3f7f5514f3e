//! # Swarm
//!
//! One accept loop plus a reader and a writer task per connection. The
//! caller owns the event receiver and replies with [`Swarm::send_to`].

use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::topic::Topic;
use parking_lot::Mutex;
use shared_types::Broadcaster;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub type ConnectionId = u64;

const HELLO: &str = "HELLO";

/// Something that happened on the swarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Handshake completed; frames may now be sent to `id`.
    Connected(ConnectionId),
    /// One frame, newline stripped.
    Data(ConnectionId, Vec<u8>),
    Disconnected(ConnectionId),
}

struct Inner {
    topic: Topic,
    config: NetworkConfig,
    peers: Mutex<HashMap<ConnectionId, mpsc::Sender<Vec<u8>>>>,
    next_id: AtomicU64,
    events: mpsc::Sender<NetworkEvent>,
    shutdown: watch::Sender<bool>,
}

/// Handle on a joined swarm. Dropping it stops accepting and closes every connection.
pub struct Swarm {
    inner: Arc<Inner>,
    local_addr: SocketAddr,
}

impl Swarm {
    /// Listen on `config.listen_addr` and dial `config.peers` in the background.
    pub async fn join(
        config: NetworkConfig,
    ) -> Result<(Swarm, mpsc::Receiver<NetworkEvent>), NetworkError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let (events_tx, events_rx) = mpsc::channel(config.event_queue.max(1));
        let (shutdown, _) = watch::channel(false);

        let inner = Arc::new(Inner {
            topic: config.topic,
            peers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events: events_tx,
            shutdown,
            config,
        });

        info!(
            "[b2-05] 🌐 Listening on {} (topic {})",
            local_addr,
            &inner.topic.to_hex()[..16]
        );
        tokio::spawn(Arc::clone(&inner).accept_loop(listener));

        for addr in inner.config.peers.clone() {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                if let Err(e) = inner.dial(addr).await {
                    warn!(%addr, error = %e, "[b2-05] Could not join peer");
                }
            });
        }

        Ok((Swarm { inner, local_addr }, events_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn topic(&self) -> Topic {
        self.inner.topic
    }

    /// Connect to `addr` and complete the handshake.
    pub async fn dial(&self, addr: SocketAddr) -> Result<ConnectionId, NetworkError> {
        Arc::clone(&self.inner).dial(addr).await
    }

    /// Queue `frame` for every connected peer. Returns how many accepted it.
    pub fn broadcast(&self, frame: &[u8]) -> usize {
        let line = framed(frame);
        let peers = self.inner.peers.lock();
        let mut sent = 0;
        for (id, outbound) in peers.iter() {
            match outbound.try_send(line.clone()) {
                Ok(()) => sent += 1,
                Err(_) => debug!(connection = id, "[b2-05] Dropped broadcast frame"),
            }
        }
        sent
    }

    /// Queue `frame` for one peer.
    pub fn send_to(&self, id: ConnectionId, frame: &[u8]) -> Result<(), NetworkError> {
        let peers = self.inner.peers.lock();
        let outbound = peers.get(&id).ok_or(NetworkError::UnknownPeer(id))?;
        outbound.try_send(framed(frame)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NetworkError::QueueFull(id),
            mpsc::error::TrySendError::Closed(_) => NetworkError::UnknownPeer(id),
        })
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.lock().len()
    }

    pub fn peers(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.inner.peers.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Stop accepting and close every connection.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        self.inner.peers.lock().clear();
    }
}

impl Drop for Swarm {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Broadcaster for Swarm {
    fn broadcast(&self, frame: &[u8]) -> usize {
        Swarm::broadcast(self, frame)
    }
}

impl Inner {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown.changed() => break,
            };
            match accepted {
                Ok((stream, addr)) => {
                    let inner = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = inner.establish(stream, addr).await {
                            debug!(%addr, error = %e, "[b2-05] Inbound handshake failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "[b2-05] Accept failed"),
            }
        }
        debug!("[b2-05] Accept loop stopped");
    }

    async fn dial(self: Arc<Self>, addr: SocketAddr) -> Result<ConnectionId, NetworkError> {
        let stream = TcpStream::connect(addr).await?;
        self.establish(stream, addr).await
    }

    /// Exchange HELLO lines, register the peer and start its reader and writer.
    async fn establish(
        self: Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> Result<ConnectionId, NetworkError> {
        let _ = stream.set_nodelay(true);
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        write
            .write_all(format!("{HELLO} {}\n", self.topic.to_hex()).as_bytes())
            .await?;

        let hello = tokio::time::timeout(
            self.config.handshake_timeout(),
            read_frame(&mut reader, HELLO.len() + 1 + 64),
        )
        .await
        .map_err(|_| NetworkError::HandshakeTimeout)??
        .ok_or_else(|| NetworkError::Io(io::ErrorKind::UnexpectedEof.into()))?;

        let found = parse_hello(&hello)?;
        if found != self.topic {
            return Err(NetworkError::TopicMismatch {
                expected: self.topic.to_hex(),
                found: found.to_hex(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_queue.max(1));
        self.peers.lock().insert(id, outbound_tx);
        tokio::spawn(write_loop(id, write, outbound_rx));

        info!("[b2-05] 🤝 Peer {} connected ({})", id, addr);
        if self.events.send(NetworkEvent::Connected(id)).await.is_err() {
            self.peers.lock().remove(&id);
            return Ok(id);
        }

        tokio::spawn(Arc::clone(&self).read_loop(id, reader));
        Ok(id)
    }

    async fn read_loop<R>(self: Arc<Self>, id: ConnectionId, mut reader: R)
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let mut shutdown = self.shutdown.subscribe();
        let max = self.config.max_frame_len;

        while !*shutdown.borrow() {
            let frame = tokio::select! {
                frame = read_frame(&mut reader, max) => frame,
                _ = shutdown.changed() => break,
            };
            match frame {
                Ok(Some(frame)) if frame.is_empty() => continue,
                Ok(Some(frame)) => {
                    if self.events.send(NetworkEvent::Data(id, frame)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(connection = id, error = %e, "[b2-05] Read failed");
                    break;
                }
            }
        }

        if self.peers.lock().remove(&id).is_some() {
            info!("[b2-05] 👋 Peer {} disconnected", id);
        }
        let _ = self.events.send(NetworkEvent::Disconnected(id)).await;
    }
}

async fn write_loop(id: ConnectionId, mut write: OwnedWriteHalf, mut outbound: mpsc::Receiver<Vec<u8>>) {
    while let Some(line) = outbound.recv().await {
        if let Err(e) = write.write_all(&line).await {
            debug!(connection = id, error = %e, "[b2-05] Write failed");
            break;
        }
    }
    let _ = write.shutdown().await;
}

fn framed(frame: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(frame.len() + 1);
    line.extend_from_slice(frame);
    line.push(b'\n');
    line
}

/// Read one newline-terminated frame of at most `max` bytes.
///
/// `Ok(None)` on a clean end of stream.
async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Option<Vec<u8>>, NetworkError>
where
    R: tokio::io::AsyncBufRead + AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max as u64 + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        return Ok(Some(buf));
    }
    if buf.len() > max {
        return Err(NetworkError::FrameTooLarge { len: buf.len(), max });
    }
    // Stream ended mid-frame.
    Ok(None)
}

fn parse_hello(line: &[u8]) -> Result<Topic, NetworkError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| NetworkError::InvalidTopic("handshake is not UTF-8".into()))?;
    match line.split_once(' ') {
        Some((HELLO, hex)) => Topic::from_hex(hex),
        _ => Err(NetworkError::InvalidTopic(format!("unexpected handshake {line:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next(events: &mut mpsc::Receiver<NetworkEvent>) -> NetworkEvent {
        timeout(WAIT, events.recv()).await.unwrap().unwrap()
    }

    async fn connected_pair() -> (Swarm, mpsc::Receiver<NetworkEvent>, Swarm, mpsc::Receiver<NetworkEvent>) {
        let (a, mut a_events) = Swarm::join(NetworkConfig::local()).await.unwrap();
        let config = NetworkConfig {
            peers: vec![a.local_addr()],
            ..NetworkConfig::local()
        };
        let (b, mut b_events) = Swarm::join(config).await.unwrap();

        assert!(matches!(next(&mut a_events).await, NetworkEvent::Connected(_)));
        assert!(matches!(next(&mut b_events).await, NetworkEvent::Connected(_)));
        (a, a_events, b, b_events)
    }

    #[test]
    fn test_parse_hello() {
        let line = format!("HELLO {}", Topic::default().to_hex());
        assert_eq!(parse_hello(line.as_bytes()).unwrap(), Topic::default());
        assert!(parse_hello(b"HI there").is_err());
        assert!(parse_hello(b"HELLO nothex").is_err());
    }

    #[tokio::test]
    async fn test_read_frame_splits_lines() {
        let mut reader = BufReader::new(&b"{\"a\":1}\r\n\nlast"[..]);
        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), Some(b"{\"a\":1}".to_vec()));
        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized() {
        let mut reader = BufReader::new(&b"0123456789\n"[..]);
        assert!(matches!(
            read_frame(&mut reader, 4).await,
            Err(NetworkError::FrameTooLarge { max: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_peers_exchange_frames() {
        let (a, mut a_events, b, mut b_events) = connected_pair().await;
        assert_eq!(a.peer_count(), 1);
        assert_eq!(b.peer_count(), 1);

        assert_eq!(b.broadcast(br#"{"type":"compareState","blockNumber":-1}"#), 1);
        match next(&mut a_events).await {
            NetworkEvent::Data(id, frame) => {
                assert_eq!(frame, br#"{"type":"compareState","blockNumber":-1}"#.to_vec());
                a.send_to(id, b"reply").unwrap();
            }
            other => panic!("expected data, got {other:?}"),
        }
        match next(&mut b_events).await {
            NetworkEvent::Data(_, frame) => assert_eq!(frame, b"reply".to_vec()),
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disconnect_is_reported() {
        let (a, mut a_events, b, _b_events) = connected_pair().await;
        drop(b);

        assert!(matches!(next(&mut a_events).await, NetworkEvent::Disconnected(_)));
        assert_eq!(a.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_topic_mismatch_is_rejected() {
        let (a, _a_events) = Swarm::join(NetworkConfig::local()).await.unwrap();
        let other = NetworkConfig {
            topic: Topic::new([7u8; 32]),
            ..NetworkConfig::local()
        };
        let (b, _b_events) = Swarm::join(other).await.unwrap();

        let err = b.dial(a.local_addr()).await.unwrap_err();
        assert!(matches!(err, NetworkError::TopicMismatch { .. }));
        assert_eq!(b.peer_count(), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(a.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer() {
        let (a, _events) = Swarm::join(NetworkConfig::local()).await.unwrap();
        assert!(matches!(a.send_to(42, b"x"), Err(NetworkError::UnknownPeer(42))));
        assert_eq!(a.broadcast(b"x"), 0);
    }
}
