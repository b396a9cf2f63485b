// Client sessions, the live-session registry, and change fan-out

mod broadcast;
mod client;
mod registry;

pub use broadcast::BroadcastFanout;
pub use client::{ClientSession, SessionClosed, SessionHandle};
pub use registry::SessionRegistry;
