use crate::state::entity::{Attributes, ChangeEvent, World};
use crate::state::notifier::{ChangeListener, ChangeNotifier, ListenerId, NotifyError};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// World store holds the in-memory world state
///
/// A single coarse lock guards the whole world so snapshots always reflect one
/// instant. Listeners are notified before the write lock is released, which
/// keeps every session queue in mutation order.
pub struct WorldStore {
    world: RwLock<World>,
    notifier: ChangeNotifier,
}

impl WorldStore {
    /// Create an empty world with no listeners
    pub fn new() -> Self {
        Self {
            world: RwLock::new(World::new()),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Register a change listener (see [`ChangeNotifier::subscribe`])
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    /// Merge one attribute into an entity, creating the entity if unseen.
    ///
    /// The mutation is always applied. An `Err` only reports that a listener
    /// failed while being told about it.
    pub fn update(&self, entity: &str, key: &str, value: Value) -> Result<Attributes, NotifyError> {
        let mut world = self.write_world();

        let attributes = world.entry(entity.to_string()).or_default();
        attributes.insert(key.to_string(), value);

        let event = ChangeEvent::new(entity, attributes.clone());
        self.notifier.notify(&event)?;
        Ok(event.data)
    }

    /// Replace an entity's attribute map wholesale.
    pub fn set(&self, entity: &str, data: Attributes) -> Result<Attributes, NotifyError> {
        let mut world = self.write_world();

        world.insert(entity.to_string(), data.clone());

        let event = ChangeEvent::new(entity, data);
        self.notifier.notify(&event)?;
        Ok(event.data)
    }

    /// Get an entity's attributes; unseen entities read as empty.
    pub fn get(&self, entity: &str) -> Attributes {
        self.read_world().get(entity).cloned().unwrap_or_default()
    }

    /// Copy of the full world at a single instant
    pub fn snapshot(&self) -> World {
        self.read_world().clone()
    }

    /// Run `f` against the world while mutations are held off.
    ///
    /// Anything `f` does (e.g. registering a session) is ordered strictly
    /// between the mutations already in the view and the ones that follow.
    pub fn snapshot_with<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        let world = self.read_world();
        f(&world)
    }

    /// Reset the world to empty and return the (empty) snapshot.
    ///
    /// Clearing is a bulk reset, not an entity mutation, so no listener runs.
    pub fn clear(&self) -> World {
        let mut world = self.write_world();
        let removed = world.len();
        world.clear();
        info!(removed = removed, "World cleared");
        world.clone()
    }

    /// Number of entities currently in the world
    pub fn len(&self) -> usize {
        self.read_world().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A listener panic poisons the lock after the map write already landed,
    // so the inner state is still consistent.
    fn read_world(&self) -> RwLockReadGuard<'_, World> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_world(&self) -> RwLockWriteGuard<'_, World> {
        self.world.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}
