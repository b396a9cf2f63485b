//! Observer registry invoked synchronously on every store mutation.
//!
//! Listeners are tagged with a [`ListenerId`] so they can be removed again.
//! The store calls [`ChangeNotifier::notify`] while it still holds its write
//! lock, so listeners must never call back into the store.

use crate::state::entity::ChangeEvent;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::warn;

/// Error type listeners report back to the notifier
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Something that wants to hear about every entity change
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ListenerError>;
}

impl<F> ChangeListener for F
where
    F: Fn(&ChangeEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Tag identifying a registered listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A listener failed after the store had already committed the mutation.
#[derive(Debug, Error)]
#[error("{listener} failed for entity '{entity}': {source}")]
pub struct NotifyError {
    pub listener: ListenerId,
    pub entity: String,
    #[source]
    pub source: ListenerError,
}

/// Ordered list of tagged listeners
pub struct ChangeNotifier {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ChangeListener>)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a listener; it runs after every listener registered before it.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns false if the tag was unknown.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Invoke every listener in registration order.
    ///
    /// A failing listener does not stop the ones after it; the first failure
    /// is returned to the caller once all listeners have run.
    pub fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        // Clone the list so a listener may (un)subscribe without deadlocking
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut first_failure = None;
        for (id, listener) in listeners {
            if let Err(source) = listener.on_change(event) {
                warn!(listener = %id, entity = %event.entity, error = %source, "Change listener failed");
                if first_failure.is_none() {
                    first_failure = Some(NotifyError {
                        listener: id,
                        entity: event.entity.clone(),
                        source,
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn event(entity: &str) -> ChangeEvent {
        let data = json!({ "x": 1 }).as_object().cloned().unwrap();
        ChangeEvent::new(entity, data)
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let notifier = ChangeNotifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            notifier.subscribe(Arc::new(move |_: &ChangeEvent| -> Result<(), ListenerError> {
                calls.lock().unwrap().push(tag);
                Ok(())
            }));
        }

        notifier.notify(&event("ball")).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_listener_is_surfaced_and_others_still_run() {
        let notifier = ChangeNotifier::new();
        let reached = Arc::new(Mutex::new(false));

        let failing = notifier.subscribe(Arc::new(|_: &ChangeEvent| -> Result<(), ListenerError> {
            Err("queue exploded".into())
        }));
        let flag = Arc::clone(&reached);
        notifier.subscribe(Arc::new(move |_: &ChangeEvent| -> Result<(), ListenerError> {
            *flag.lock().unwrap() = true;
            Ok(())
        }));

        let err = notifier.notify(&event("ball")).unwrap_err();
        assert_eq!(err.listener, failing);
        assert_eq!(err.entity, "ball");
        assert!(err.to_string().contains("queue exploded"));
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let id = notifier.subscribe(Arc::new(move |_: &ChangeEvent| -> Result<(), ListenerError> {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));

        notifier.notify(&event("a")).unwrap();
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&event("a")).unwrap();

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(notifier.listener_count(), 0);
    }
}
