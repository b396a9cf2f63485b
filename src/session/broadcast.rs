use crate::session::registry::SessionRegistry;
use crate::state::{ChangeEvent, ChangeListener, ListenerError, ListenerId, WorldStore};
use crate::subscription::protocol::encode_change;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Bridges store change events to every live session queue
pub struct BroadcastFanout {
    registry: Arc<SessionRegistry>,
}

impl BroadcastFanout {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Register a fan-out listener on `store` for `registry`
    pub fn attach(store: &WorldStore, registry: Arc<SessionRegistry>) -> ListenerId {
        store.subscribe(Arc::new(Self::new(registry)))
    }

    /// Enqueue `message` on every registered session.
    ///
    /// Sessions whose queue is gone are skipped and pruned afterwards, so one
    /// dead session never blocks delivery to the rest. Returns the number of
    /// sessions that accepted the message.
    pub fn broadcast(&self, message: &str) -> usize {
        let mut delivered = 0;
        let mut dead: Vec<Uuid> = Vec::new();

        self.registry.for_each(|session| match session.enqueue(message.to_string()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Dropping event for closed session");
                dead.push(session.id());
            }
        });

        // Pruned after the pass; the registry must not be mutated mid-iteration
        for id in dead {
            self.registry.unregister(id);
        }

        delivered
    }
}

impl ChangeListener for BroadcastFanout {
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        let message = encode_change(event)?;
        let delivered = self.broadcast(&message);
        debug!(entity = %event.entity, sessions = delivered, "Broadcast change event");
        Ok(())
    }
}
