// Configuration
pub mod config;

// Shared world state and change notification
pub mod state;

// Client sessions, registry, and fan-out
pub mod session;

// Socket protocol and connection handling
pub mod subscription;

// HTTP and WebSocket APIs
pub mod api;
