//! Relation end point handles and their command factory
//!
//! An [`EndPoint`] is either a real end point `(entity, property)` or the
//! null end point standing in for an absent entity on the opposite side of a
//! relation. Building a mutating command on the null end point is an
//! argument error; callers that want nothing to happen use `Command::Noop`.

use std::fmt;

use tether_core_types::EntityId;

use crate::command::Command;
use crate::errors::{RelationError, Result};
use crate::graph::{CollectionId, RelationGraph};
use crate::model::{Cardinality, RelationEndPointId, RelationKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndPoint {
    Real(RelationEndPointId),
    Null,
}

impl EndPoint {
    pub fn is_null(&self) -> bool {
        matches!(self, EndPoint::Null)
    }

    pub fn id(&self) -> Option<&RelationEndPointId> {
        match self {
            EndPoint::Real(id) => Some(id),
            EndPoint::Null => None,
        }
    }

    /// The real end point id
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point.
    pub fn require_real(&self) -> Result<&RelationEndPointId> {
        self.id().ok_or_else(|| {
            RelationError::invalid_argument(
                "modified_end_point",
                "cannot build a command for the null end point, use the no-op command",
            )
        })
    }

    /// Assign an object end point
    ///
    /// Routes to the self-replace command when `new` equals the current
    /// value, otherwise by relation kind.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point or a collection end
    /// point, or `RelatedTypeMismatch` if `new` is of the wrong type.
    pub fn create_set_command(&self, graph: &RelationGraph, new: Option<EntityId>) -> Result<Command> {
        let id = self.require_real()?;
        if graph.end_point_definition(id)?.cardinality != Cardinality::One {
            return Err(RelationError::invalid_argument(
                "modified_end_point",
                format!("{} is a collection end point, assign a collection instead", id),
            ));
        }
        if graph.related_object(id)? == new {
            return Command::set_same(graph, id.clone());
        }
        match graph.relation_definition(id)?.kind {
            RelationKind::Unidirectional => Command::set_unidirectional(graph, id.clone(), new),
            RelationKind::OneToMany => Command::set_one_many(graph, id.clone(), new),
            RelationKind::OneToOne => Command::set_one_one(graph, id.clone(), new),
        }
    }

    /// Remove `related` from the end point
    ///
    /// Collection end points remove the member; object end points are set to
    /// null when they currently reference `related`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point, or
    /// `ItemNotInCollection` / `RelatedObjectMismatch` when `related` is not
    /// currently related.
    pub fn create_remove_command(&self, graph: &RelationGraph, related: &EntityId) -> Result<Command> {
        let id = self.require_real()?;
        match graph.end_point_definition(id)?.cardinality {
            Cardinality::Many => Command::collection_remove(graph, id.clone(), related),
            Cardinality::One => {
                if graph.related_object(id)?.as_ref() != Some(related) {
                    return Err(RelationError::RelatedObjectMismatch {
                        end_point: id.to_string(),
                        related_id: related.to_string(),
                    });
                }
                self.create_set_command(graph, None)
            }
        }
    }

    /// Insert `related` at `index` of a collection end point
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point, plus the errors of
    /// [`Command::collection_insert`].
    pub fn create_insert_command(
        &self,
        graph: &RelationGraph,
        index: usize,
        related: EntityId,
    ) -> Result<Command> {
        Command::collection_insert(graph, self.require_real()?.clone(), index, related)
    }

    /// Append `related` to a collection end point
    ///
    /// # Errors
    ///
    /// Same as [`EndPoint::create_insert_command`].
    pub fn create_add_command(&self, graph: &RelationGraph, related: EntityId) -> Result<Command> {
        let id = self.require_real()?;
        let len = graph.related_objects(id)?.len();
        Command::collection_insert(graph, id.clone(), len, related)
    }

    /// Replace the member at `index` with `related`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point, plus the errors of
    /// [`Command::collection_replace`].
    pub fn create_replace_command(
        &self,
        graph: &RelationGraph,
        index: usize,
        related: EntityId,
    ) -> Result<Command> {
        let id = self.require_real()?;
        if graph.related_objects(id)?.get(index) == Some(&related) {
            return Command::collection_replace_same(graph, id.clone(), index);
        }
        Command::collection_replace(graph, id.clone(), index, related)
    }

    /// Replace the whole collection with `new_collection`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point, plus the errors of
    /// [`Command::set_collection`].
    pub fn create_set_collection_command(
        &self,
        graph: &RelationGraph,
        new_collection: &CollectionId,
    ) -> Result<Command> {
        Command::set_collection(graph, self.require_real()?.clone(), new_collection)
    }

    /// Clear the end point of an owner being deleted, without events
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the null end point.
    pub fn create_delete_command(&self, graph: &RelationGraph) -> Result<Command> {
        let id = self.require_real()?;
        match graph.end_point_definition(id)?.cardinality {
            Cardinality::Many => Command::collection_delete(graph, id.clone()),
            Cardinality::One => Command::object_delete(graph, id.clone()),
        }
    }

    pub fn create_touch_command(&self, graph: &RelationGraph) -> Result<Command> {
        match self {
            EndPoint::Real(id) => Command::touch(graph, id.clone()),
            EndPoint::Null => Ok(Command::Noop),
        }
    }
}

impl From<RelationEndPointId> for EndPoint {
    fn from(id: RelationEndPointId) -> Self {
        EndPoint::Real(id)
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndPoint::Real(id) => write!(f, "{}", id),
            EndPoint::Null => write!(f, "<null>"),
        }
    }
}
