use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute set of a single entity (key -> arbitrary JSON value)
pub type Attributes = Map<String, Value>;

/// The whole shared world: entity name -> attributes
pub type World = HashMap<String, Attributes>;

/// Change notification produced once per mutating store operation
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    /// Name of the entity that changed
    pub entity: String,

    /// Full attribute map of the entity after the mutation
    pub data: Attributes,
}

impl ChangeEvent {
    pub fn new(entity: impl Into<String>, data: Attributes) -> Self {
        Self {
            entity: entity.into(),
            data,
        }
    }
}
