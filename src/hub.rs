//! Fan-out of server messages to connected clients.

use crate::protocol::{Outbox, ServerMessage};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Unique identifier for a client connection.
pub type ConnectionId = u64;

type Connections = HashMap<ConnectionId, mpsc::Sender<String>>;

/// Registry of connected clients, each with a bounded outbound queue.
///
/// Messages are serialized once and queued without waiting. A client whose
/// queue is full misses the message; the game itself is unaffected.
#[derive(Debug, Clone)]
pub struct Hub {
    connections: Arc<Mutex<Connections>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl Hub {
    /// Creates an empty hub with `capacity` queued messages per client.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.get(),
        }
    }

    /// Adds a connection. The receiver yields JSON frames to write out.
    #[instrument(skip(self))]
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock().insert(id, tx);
        debug!(connection = id, "Connection registered");
        (id, rx)
    }

    /// Removes a connection. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub fn unregister(&self, id: ConnectionId) {
        if self.lock().remove(&id).is_some() {
            debug!(connection = id, "Connection removed");
        }
    }

    /// Number of connected clients.
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Queues a message for one connection. Returns false if it was dropped.
    pub fn send_to(&self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        match self.lock().get(&id) {
            Some(tx) => queue(id, tx, frame, message.label()),
            None => {
                debug!(connection = id, kind = message.label(), "Reply to departed connection dropped");
                false
            }
        }
    }

    /// Queues a message for every connection.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let connections = self.lock();
        let delivered = connections
            .iter()
            .filter(|(id, tx)| queue(**id, tx, frame.clone(), message.label()))
            .count();
        debug!(kind = message.label(), recipients = delivered, "Broadcast message");
    }

    /// Routes a session's replies to `connection` and broadcasts to everyone.
    pub fn outbox(&self, connection: ConnectionId) -> ConnectionOutbox<'_> {
        ConnectionOutbox {
            hub: self,
            connection,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connections> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`Outbox`] bound to the connection that sent the current request.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOutbox<'a> {
    hub: &'a Hub,
    connection: ConnectionId,
}

impl Outbox for ConnectionOutbox<'_> {
    fn reply(&self, message: ServerMessage) {
        self.hub.send_to(self.connection, &message);
    }

    fn broadcast(&self, message: ServerMessage) {
        self.hub.broadcast(&message);
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(kind = message.label(), error = %e, "Failed to serialize message");
            None
        }
    }
}

fn queue(id: ConnectionId, tx: &mpsc::Sender<String>, frame: String, kind: &str) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            warn!(connection = id, kind, len = frame.len(), "Send queue full, dropping message");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
