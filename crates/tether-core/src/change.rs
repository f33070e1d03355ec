//! Requested relation changes
//!
//! A [`RelationChange`] is the user-level description of one mutation on one
//! end point. [`build_command`] resolves it against the graph into the
//! matching [`Command`].

use serde::{Deserialize, Serialize};
use tether_core_types::EntityId;

use crate::command::Command;
use crate::errors::Result;
use crate::graph::{CollectionId, RelationGraph};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelationChange {
    /// `entity.property = related`
    SetObject {
        entity: EntityId,
        property: String,
        related: Option<EntityId>,
    },
    /// `entity.property.insert(index, related)`
    Insert {
        entity: EntityId,
        property: String,
        index: usize,
        related: EntityId,
    },
    /// `entity.property.push(related)`
    Add {
        entity: EntityId,
        property: String,
        related: EntityId,
    },
    /// `entity.property.remove(related)`, or clearing a reference to `related`
    Remove {
        entity: EntityId,
        property: String,
        related: EntityId,
    },
    /// `entity.property[index] = related`
    Replace {
        entity: EntityId,
        property: String,
        index: usize,
        related: EntityId,
    },
    /// `entity.property = collection`
    ReplaceCollection {
        entity: EntityId,
        property: String,
        collection: CollectionId,
    },
    /// Mark the end point as accessed without changing it
    Touch { entity: EntityId, property: String },
}

impl RelationChange {
    pub fn set_object(entity: EntityId, property: impl Into<String>, related: Option<EntityId>) -> Self {
        RelationChange::SetObject {
            entity,
            property: property.into(),
            related,
        }
    }

    pub fn insert(entity: EntityId, property: impl Into<String>, index: usize, related: EntityId) -> Self {
        RelationChange::Insert {
            entity,
            property: property.into(),
            index,
            related,
        }
    }

    pub fn add(entity: EntityId, property: impl Into<String>, related: EntityId) -> Self {
        RelationChange::Add {
            entity,
            property: property.into(),
            related,
        }
    }

    pub fn remove(entity: EntityId, property: impl Into<String>, related: EntityId) -> Self {
        RelationChange::Remove {
            entity,
            property: property.into(),
            related,
        }
    }

    pub fn replace(entity: EntityId, property: impl Into<String>, index: usize, related: EntityId) -> Self {
        RelationChange::Replace {
            entity,
            property: property.into(),
            index,
            related,
        }
    }

    pub fn replace_collection(
        entity: EntityId,
        property: impl Into<String>,
        collection: CollectionId,
    ) -> Self {
        RelationChange::ReplaceCollection {
            entity,
            property: property.into(),
            collection,
        }
    }

    pub fn touch(entity: EntityId, property: impl Into<String>) -> Self {
        RelationChange::Touch {
            entity,
            property: property.into(),
        }
    }

    /// Entity owning the modified end point
    pub fn entity(&self) -> &EntityId {
        match self {
            RelationChange::SetObject { entity, .. }
            | RelationChange::Insert { entity, .. }
            | RelationChange::Add { entity, .. }
            | RelationChange::Remove { entity, .. }
            | RelationChange::Replace { entity, .. }
            | RelationChange::ReplaceCollection { entity, .. }
            | RelationChange::Touch { entity, .. } => entity,
        }
    }

    pub fn property(&self) -> &str {
        match self {
            RelationChange::SetObject { property, .. }
            | RelationChange::Insert { property, .. }
            | RelationChange::Add { property, .. }
            | RelationChange::Remove { property, .. }
            | RelationChange::Replace { property, .. }
            | RelationChange::ReplaceCollection { property, .. }
            | RelationChange::Touch { property, .. } => property,
        }
    }

    /// Short operation name used in logs
    pub fn op_name(&self) -> &'static str {
        match self {
            RelationChange::SetObject { .. } => "set_object",
            RelationChange::Insert { .. } => "insert",
            RelationChange::Add { .. } => "add",
            RelationChange::Remove { .. } => "remove",
            RelationChange::Replace { .. } => "replace",
            RelationChange::ReplaceCollection { .. } => "replace_collection",
            RelationChange::Touch { .. } => "touch",
        }
    }
}

/// Build the command for a requested change
///
/// The graph is only read.
///
/// # Errors
///
/// Returns a lookup error if the entity or property is unknown, or the
/// construction error of the selected command.
pub fn build_command(graph: &RelationGraph, change: &RelationChange) -> Result<Command> {
    let end_point = graph.end_point(change.entity(), change.property())?;
    match change {
        RelationChange::SetObject { related, .. } => {
            end_point.create_set_command(graph, related.clone())
        }
        RelationChange::Insert { index, related, .. } => {
            end_point.create_insert_command(graph, *index, related.clone())
        }
        RelationChange::Add { related, .. } => end_point.create_add_command(graph, related.clone()),
        RelationChange::Remove { related, .. } => end_point.create_remove_command(graph, related),
        RelationChange::Replace { index, related, .. } => {
            end_point.create_replace_command(graph, *index, related.clone())
        }
        RelationChange::ReplaceCollection { collection, .. } => {
            end_point.create_set_collection_command(graph, collection)
        }
        RelationChange::Touch { .. } => end_point.create_touch_command(graph),
    }
}
