// Shared world state and change notification

mod entity;
mod notifier;
mod store;

pub use entity::{Attributes, ChangeEvent, World};
pub use notifier::{ChangeListener, ChangeNotifier, ListenerError, ListenerId, NotifyError};
pub use store::WorldStore;
