//! Commands assigning an object-valued end point

use tether_core_types::EntityId;

use super::{collection, live_definition, require_cardinality, require_related_type, Command, RelationChangeEvent};
use crate::end_point::EndPoint;
use crate::errors::{RelationError, Result};
use crate::graph::RelationGraph;
use crate::model::{Cardinality, RelationEndPointId, RelationKind};

/// `(end point, old related, new related)` of an object assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSet {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) old: Option<EntityId>,
    pub(crate) new: Option<EntityId>,
}

impl ObjectSet {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn old(&self) -> Option<&EntityId> {
        self.old.as_ref()
    }

    pub fn new_related(&self) -> Option<&EntityId> {
        self.new.as_ref()
    }

    pub(crate) fn event(&self) -> RelationChangeEvent {
        RelationChangeEvent::new(&self.end_point, self.old.clone(), self.new.clone())
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::One)?;
        let current = graph.related_object(&self.end_point)?;
        if current != self.old {
            return Err(RelationError::RelatedObjectMismatch {
                end_point: self.end_point.to_string(),
                related_id: display_related(self.old.as_ref()),
            });
        }
        if let Some(new) = &self.new {
            require_related_type(graph, &self.end_point, new)?;
        }
        Ok(())
    }
}

/// Object self-replace: touches without raising events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSame {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) related: Option<EntityId>,
}

impl SetSame {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn related(&self) -> Option<&EntityId> {
        self.related.as_ref()
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        live_definition(graph, &self.end_point)?;
        Ok(())
    }
}

impl Command {
    /// Assign the real end of a one-to-one relation
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the end point is not a one-to-one object
    /// end point, or if `new` equals the current value (use
    /// [`Command::set_same`]). Returns `RelatedTypeMismatch` if `new` is of
    /// the wrong type.
    pub fn set_one_one(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        new: Option<EntityId>,
    ) -> Result<Command> {
        let set = object_set(graph, end_point, new)?;
        match graph.relation_definition(&set.end_point)?.kind {
            RelationKind::OneToOne => Ok(Command::SetOneOne(set)),
            RelationKind::Unidirectional => Err(RelationError::invalid_argument(
                "modified_end_point",
                format!(
                    "{} is a unidirectional end point, use the unidirectional set command",
                    set.end_point
                ),
            )),
            RelationKind::OneToMany => Err(RelationError::invalid_argument(
                "modified_end_point",
                format!(
                    "{} is the object end of a one-to-many relation, use the one-to-many set command",
                    set.end_point
                ),
            )),
        }
    }

    /// Assign the object end of a one-to-many relation
    ///
    /// # Errors
    ///
    /// Same as [`Command::set_one_one`], for one-to-many object end points.
    pub fn set_one_many(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        new: Option<EntityId>,
    ) -> Result<Command> {
        let set = object_set(graph, end_point, new)?;
        match graph.relation_definition(&set.end_point)?.kind {
            RelationKind::OneToMany => Ok(Command::SetOneMany(set)),
            _ => Err(RelationError::invalid_argument(
                "modified_end_point",
                format!("{} is not the object end of a one-to-many relation", set.end_point),
            )),
        }
    }

    /// Assign a reference whose opposite end is anonymous
    ///
    /// # Errors
    ///
    /// Same as [`Command::set_one_one`], for unidirectional end points.
    pub fn set_unidirectional(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        new: Option<EntityId>,
    ) -> Result<Command> {
        let set = object_set(graph, end_point, new)?;
        match graph.relation_definition(&set.end_point)?.kind {
            RelationKind::Unidirectional => Ok(Command::SetUnidirectional(set)),
            _ => Err(RelationError::invalid_argument(
                "modified_end_point",
                format!("{} is not a unidirectional end point", set.end_point),
            )),
        }
    }

    /// Re-assign an object end point its current value
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the end point is not an object end point.
    pub fn set_same(graph: &RelationGraph, end_point: RelationEndPointId) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::One)?;
        let related = graph.related_object(&end_point)?;
        Ok(Command::SetSame(SetSame { end_point, related }))
    }
}

fn object_set(
    graph: &RelationGraph,
    end_point: RelationEndPointId,
    new: Option<EntityId>,
) -> Result<ObjectSet> {
    require_cardinality(graph, &end_point, Cardinality::One)?;
    if let Some(new) = &new {
        require_related_type(graph, &end_point, new)?;
    }
    let old = graph.related_object(&end_point)?;
    if old == new {
        return Err(RelationError::invalid_argument(
            "new_related",
            format!(
                "{} already references {}, use the self-replace command",
                end_point,
                display_related(new.as_ref())
            ),
        ));
    }
    Ok(ObjectSet { end_point, old, new })
}

fn display_related(related: Option<&EntityId>) -> String {
    related.map_or_else(|| "null".to_string(), ToString::to_string)
}

/// Command setting the back-reference `end_point` to `new`
///
/// Reads the current value from the graph and falls back to a self-replace
/// when nothing would change.
pub(crate) fn back_reference_command(
    graph: &RelationGraph,
    end_point: RelationEndPointId,
    new: Option<EntityId>,
) -> Result<Command> {
    let old = graph.related_object(&end_point)?;
    if old == new {
        return Ok(Command::SetSame(SetSame {
            end_point,
            related: old,
        }));
    }
    let kind = graph.relation_definition(&end_point)?.kind;
    let set = ObjectSet { end_point, old, new };
    Ok(match kind {
        RelationKind::OneToOne => Command::SetOneOne(set),
        RelationKind::OneToMany => Command::SetOneMany(set),
        RelationKind::Unidirectional => Command::SetUnidirectional(set),
    })
}

/// Back-reference command for the end point opposite `end_point` on `related`
pub(crate) fn opposite_back_reference(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    related: Option<&EntityId>,
    new: Option<EntityId>,
) -> Result<Command> {
    match graph.opposite_end_point(end_point, related)? {
        EndPoint::Real(back) => back_reference_command(graph, back, new),
        EndPoint::Null => Ok(Command::Noop),
    }
}

/// `[this, old partner -> null, new partner -> owner, new partner's previous partner -> null]`
pub(crate) fn expand_one_one(set: &ObjectSet, graph: &RelationGraph) -> Result<Vec<Command>> {
    let owner = &set.end_point.entity_id;
    let mut commands = Vec::with_capacity(4);
    commands.push(Command::SetOneOne(set.clone()));
    commands.push(opposite_back_reference(
        graph,
        &set.end_point,
        set.old.as_ref(),
        None,
    )?);

    match graph.opposite_end_point(&set.end_point, set.new.as_ref())? {
        EndPoint::Real(back) => {
            let previous = graph
                .related_object(&back)?
                .filter(|previous| previous != owner);
            commands.push(back_reference_command(graph, back.clone(), Some(owner.clone()))?);
            commands.push(opposite_back_reference(graph, &back, previous.as_ref(), None)?);
        }
        EndPoint::Null => {
            commands.push(Command::Noop);
            commands.push(Command::Noop);
        }
    }
    Ok(commands)
}

/// `[this, old owner's collection remove(this), new owner's collection add(this)]`
pub(crate) fn expand_one_many(set: &ObjectSet, graph: &RelationGraph) -> Result<Vec<Command>> {
    let entity = &set.end_point.entity_id;
    let remove = match graph.opposite_end_point(&set.end_point, set.old.as_ref())? {
        EndPoint::Real(collection) => collection::remove_member_command(graph, collection, entity)?,
        EndPoint::Null => Command::Noop,
    };
    let add = match graph.opposite_end_point(&set.end_point, set.new.as_ref())? {
        EndPoint::Real(collection) => collection::add_member_command(graph, collection, entity)?,
        EndPoint::Null => Command::Noop,
    };
    Ok(vec![Command::SetOneMany(set.clone()), remove, add])
}

/// `[this, touch of the related object's back-reference]`
pub(crate) fn expand_same(same: &SetSame, graph: &RelationGraph) -> Result<Vec<Command>> {
    let mut commands = vec![Command::SetSame(same.clone())];
    if let EndPoint::Real(back) = graph.opposite_end_point(&same.end_point, same.related.as_ref())? {
        commands.push(Command::Touch(back));
    }
    Ok(commands)
}
