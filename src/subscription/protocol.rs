use crate::state::{Attributes, ChangeEvent, World};
use serde_json::{Map, Value};
use thiserror::Error;

/// Client → Server: whole-entity write decoded from `{"<entity>": {...}}`
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWrite {
    pub entity: String,
    pub data: Attributes,
}

/// Why an inbound socket payload was rejected
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message must be a JSON object")]
    NotAnObject,

    #[error("message names no entity")]
    Empty,

    #[error("message names {0} entities, expected exactly one")]
    MultipleEntities(usize),

    #[error("attributes for entity '{0}' must be a JSON object")]
    AttributesNotAnObject(String),
}

/// Decode a client message into a single entity write.
pub fn decode_entity_write(text: &str) -> Result<EntityWrite, ProtocolError> {
    let packet = match serde_json::from_str::<Value>(text)? {
        Value::Object(packet) => packet,
        _ => return Err(ProtocolError::NotAnObject),
    };

    if packet.len() > 1 {
        return Err(ProtocolError::MultipleEntities(packet.len()));
    }

    let (entity, data) = packet.into_iter().next().ok_or(ProtocolError::Empty)?;
    match data {
        Value::Object(data) => Ok(EntityWrite { entity, data }),
        _ => Err(ProtocolError::AttributesNotAnObject(entity)),
    }
}

/// Server → Client: `{"<entity>": <full attribute map>}`
pub fn encode_change(event: &ChangeEvent) -> serde_json::Result<String> {
    let mut message = Map::with_capacity(1);
    message.insert(event.entity.clone(), Value::Object(event.data.clone()));
    serde_json::to_string(&message)
}

/// Server → Client: the full world as one object
pub fn encode_world(world: &World) -> serde_json::Result<String> {
    serde_json::to_string(world)
}
