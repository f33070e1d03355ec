use serde::{Deserialize, Serialize};
use tether_core_types::EntityId;

/// Identity of one side of a relation on one entity instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationEndPointId {
    /// Entity owning the end point
    pub entity_id: EntityId,

    /// Relation property on the owning entity's type
    pub property: String,
}

impl RelationEndPointId {
    pub fn new(entity_id: EntityId, property: impl Into<String>) -> Self {
        Self {
            entity_id,
            property: property.into(),
        }
    }
}

impl std::fmt::Display for RelationEndPointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_id, self.property)
    }
}
