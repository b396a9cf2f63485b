// Socket wire protocol and per-connection handling

pub mod manager;
pub mod protocol;

pub use manager::{CloseReason, ConnectionHandler};
pub use protocol::{decode_entity_write, encode_change, encode_world, EntityWrite, ProtocolError};
