use crate::session::{ClientSession, SessionRegistry};
use crate::state::WorldStore;
use crate::subscription::protocol::{decode_entity_write, encode_world};
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a connection was torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame
    ClientClosed,
    /// Inbound stream ended without a close frame
    StreamEnded,
    /// No inbound frame within the idle timeout
    IdleTimeout,
    /// Receiving from the transport failed
    TransportError(String),
    /// Writing to the transport failed
    WriteFailed(String),
    /// One of the connection tasks panicked or was cancelled
    TaskFailed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client closed"),
            CloseReason::StreamEnded => write!(f, "stream ended"),
            CloseReason::IdleTimeout => write!(f, "idle timeout"),
            CloseReason::TransportError(e) => write!(f, "transport error: {}", e),
            CloseReason::WriteFailed(e) => write!(f, "write failed: {}", e),
            CloseReason::TaskFailed(e) => write!(f, "task failed: {}", e),
        }
    }
}

/// Runs one client connection: a reader loop applying writes to the store and
/// a writer loop draining the session queue, sharing one lifetime.
pub struct ConnectionHandler {
    store: Arc<WorldStore>,
    registry: Arc<SessionRegistry>,
    idle_timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(store: Arc<WorldStore>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            registry,
            idle_timeout: None,
        }
    }

    /// Close connections that send nothing for `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(self, socket: WebSocket) -> CloseReason {
        let (sink, stream) = socket.split();
        self.run(sink, stream).await
    }

    /// Drive a connection over any message sink/stream pair.
    pub async fn run<S, R>(self, sink: S, stream: R) -> CloseReason
    where
        S: Sink<Message> + Send + Unpin + 'static,
        S::Error: fmt::Display + Send,
        R: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
    {
        let session = ClientSession::new();
        let session_id = session.id();
        let connected_at = session.connected_at();

        // Snapshot first in the queue, registered before any later mutation
        self.store.snapshot_with(|world| {
            match encode_world(world) {
                Ok(json) => session.enqueue(json),
                Err(e) => error!(session_id = %session_id, error = %e, "Failed to encode world snapshot"),
            }
            self.registry.register(session.handle());
        });

        info!(
            session_id = %session_id,
            sessions = self.registry.len(),
            "WebSocket connection established"
        );

        let mut writer = tokio::spawn(write_loop(session, sink));
        let mut reader = tokio::spawn(read_loop(
            session_id,
            stream,
            Arc::clone(&self.store),
            self.idle_timeout,
        ));

        // Whichever side stops first takes the other down with it
        let reason = tokio::select! {
            result = &mut reader => {
                writer.abort();
                result.unwrap_or_else(|e| CloseReason::TaskFailed(e.to_string()))
            }
            result = &mut writer => {
                reader.abort();
                result.unwrap_or_else(|e| CloseReason::TaskFailed(e.to_string()))
            }
        };

        self.registry.unregister(session_id);

        let duration_secs = (chrono::Utc::now() - connected_at).num_seconds();
        match &reason {
            CloseReason::ClientClosed | CloseReason::StreamEnded => info!(
                session_id = %session_id,
                duration_secs = duration_secs,
                sessions = self.registry.len(),
                "WebSocket connection closed"
            ),
            other => warn!(
                session_id = %session_id,
                duration_secs = duration_secs,
                sessions = self.registry.len(),
                reason = %other,
                "WebSocket connection torn down"
            ),
        }

        reason
    }
}

/// Reader side: apply inbound entity writes until the transport closes
async fn read_loop<R>(
    session_id: Uuid,
    mut stream: R,
    store: Arc<WorldStore>,
    idle_timeout: Option<Duration>,
) -> CloseReason
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => return CloseReason::IdleTimeout,
            },
            None => stream.next().await,
        };

        match next {
            Some(Ok(Message::Text(text))) => apply_client_message(session_id, &store, &text),
            Some(Ok(Message::Close(_))) => return CloseReason::ClientClosed,
            Some(Ok(_)) => {
                // Binary and ping/pong frames carry no entity writes
            }
            Some(Err(e)) => return CloseReason::TransportError(e.to_string()),
            None => return CloseReason::StreamEnded,
        }
    }
}

/// Apply one client message as a whole-entity replace.
///
/// Malformed payloads are dropped; the connection stays open.
fn apply_client_message(session_id: Uuid, store: &WorldStore, text: &str) {
    let write = match decode_entity_write(text) {
        Ok(write) => write,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Dropping malformed client message");
            return;
        }
    };

    debug!(session_id = %session_id, entity = %write.entity, "Client set entity");

    // The sender receives its own echo through the fan-out
    if let Err(e) = store.set(&write.entity, write.data) {
        error!(session_id = %session_id, error = %e, "Entity set applied but broadcast failed");
    }
}

/// Writer side: forward queued messages to the transport
///
/// The session holds a sender of its own, so the queue never closes: the
/// writer stops on a failed write or when the reader side aborts it.
async fn write_loop<S>(mut session: ClientSession, mut sink: S) -> CloseReason
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(message) = session.dequeue().await {
        if let Err(e) = sink.send(Message::Text(message)).await {
            return CloseReason::WriteFailed(e.to_string());
        }
    }
    std::future::pending().await
}
