//! Local shadow of the bot's server-side player entity.

use gatesim_proto::{EntityId, FieldValue};
use std::collections::HashMap;

/// Client-side mirror of a server entity.
///
/// A bot holds at most one of these: the entity the server declared as the
/// bot's controlling player.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEntity {
    /// Server-assigned entity id.
    pub id: EntityId,
    /// Declared entity type name.
    pub type_name: String,
    /// Whether this entity is the bot's controlling player.
    pub is_player: bool,
    /// Client-visible fields received at creation time.
    pub fields: HashMap<String, FieldValue>,
}

impl ClientEntity {
    /// Mirror an entity announced by the server.
    pub fn new(
        id: EntityId,
        type_name: impl Into<String>,
        is_player: bool,
        fields: HashMap<String, FieldValue>,
    ) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            is_player,
            fields,
        }
    }

    /// Read one client-visible field.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Overwrite one client-visible field.
    pub fn set_field(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }
}
