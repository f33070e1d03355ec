use serde::{Deserialize, Serialize};
use tether_core_types::EntityId;
use uuid::Uuid;

use crate::model::RelationEndPointId;

/// Handle of a collection object
///
/// A collection is either associated with exactly one collection end point,
/// in which case it reads through to the end point's data, or stand-alone,
/// in which case it owns its items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(String);

impl CollectionId {
    /// Generate a new random CollectionId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage behind a collection handle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionState {
    /// End point this collection currently reads through to
    pub associated: Option<RelationEndPointId>,
    /// Own items; only meaningful while stand-alone
    pub items: Vec<EntityId>,
}

impl CollectionState {
    pub(crate) fn stand_alone(items: Vec<EntityId>) -> Self {
        Self {
            associated: None,
            items,
        }
    }

    pub(crate) fn associated_with(end_point: RelationEndPointId) -> Self {
        Self {
            associated: Some(end_point),
            items: Vec::new(),
        }
    }

    /// Whether the collection reads through to `end_point`
    pub fn is_associated_with(&self, end_point: &RelationEndPointId) -> bool {
        self.associated.as_ref() == Some(end_point)
    }
}
