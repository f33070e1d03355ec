use serde::{Deserialize, Serialize};
use tether_core_types::EntityId;

/// Registry entry for an entity participating in relations
///
/// The entity itself lives outside the engine; the graph only needs its
/// declared type to resolve end point definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identity of the entity
    pub id: EntityId,

    /// Declared entity type, as named in the mapping
    pub type_name: String,

    /// Set once the entity has been removed from the graph
    pub deleted: bool,
}

impl EntityRecord {
    /// Create a live record for an entity of the given type
    pub fn new(id: EntityId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            deleted: false,
        }
    }
}
