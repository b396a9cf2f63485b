use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The session's queue receiver is gone (its connection has torn down).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("session {0} is closed")]
pub struct SessionClosed(pub Uuid);

/// Server-side state for one live connection
///
/// Owns the receiving end of an unbounded outbound queue; producers go
/// through a [`SessionHandle`] and never block.
pub struct ClientSession {
    id: Uuid,
    connected_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ClientSession {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            tx,
            rx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Non-owning handle other components use to push into this queue
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            tx: self.tx.clone(),
        }
    }

    /// Append a message to the tail of the queue.
    pub fn enqueue(&self, message: String) {
        // The receiver lives in `self`, so this cannot fail
        let _ = self.tx.send(message);
    }

    /// Wait for the next queued message in FIFO order.
    pub async fn dequeue(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Number of messages waiting to be written
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable producer side of a [`ClientSession`] queue
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append without blocking; fails only once the session is gone.
    pub fn enqueue(&self, message: String) -> Result<(), SessionClosed> {
        self.tx.send(message).map_err(|_| SessionClosed(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
