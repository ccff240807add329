/// A live realtime connection
///
/// The transport side (the WebSocket session task) owns the receiving end
/// of a bounded channel; the registry only ever holds the sending end.
/// Frames are pre-serialized and shared, so fanning one event out to many
/// connections serializes it once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound frames buffered per connection before sends start dropping
pub const OUTBOUND_BUFFER: usize = 256;

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub struct Connection {
    pub id: ConnectionId,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    dropped: AtomicU64,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
            connected_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    /// New connection plus the receiver its transport should drain
    pub fn channel() -> (Arc<Self>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        (Arc::new(Self::new(tx)), rx)
    }

    /// Queues a frame without waiting
    ///
    /// Returns `false` and counts a drop if the buffer is full or the
    /// transport is gone.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Time since the connection was opened
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Whether the transport has hung up
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("dropped", &self.drop_count())
            .finish()
    }
}
