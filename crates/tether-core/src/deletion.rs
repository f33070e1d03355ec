//! Owner deletion
//!
//! Deleting an entity unlinks it from every related entity and then clears
//! its own end points. The opposite side is updated through event-raising
//! commands; the deleted owner's own end points are cleared silently.
//!
//! References held through unidirectional relations by other entities are
//! not tracked by the graph and are left untouched.

use tether_core_types::EntityId;

use crate::command::object_set::back_reference_command;
use crate::command::Command;
use crate::end_point::EndPoint;
use crate::errors::Result;
use crate::expanded::ExpandedCommand;
use crate::graph::RelationGraph;
use crate::model::{Cardinality, RelationEndPointId};

/// Commands removing `entity` from the graph
///
/// Opposite-side unlinks come first, in property order, followed by one
/// delete command per own end point.
///
/// # Errors
///
/// Returns `EntityNotFound` or `EntityDeleted` if the entity is not live.
pub fn build_delete_command(graph: &RelationGraph, entity: &EntityId) -> Result<ExpandedCommand> {
    let type_name = graph.entity(entity)?.type_name.clone();
    let properties = graph.mapping().properties_of(&type_name);

    let mut unlinks = Vec::new();
    let mut own = Vec::with_capacity(properties.len());

    for property in properties {
        let end_point = RelationEndPointId::new(entity.clone(), property);
        let related: Vec<EntityId> = match graph.end_point_definition(&end_point)?.cardinality {
            Cardinality::One => graph.related_object(&end_point)?.into_iter().collect(),
            Cardinality::Many => graph.related_objects(&end_point)?.to_vec(),
        };

        for related in &related {
            unlinks.push(opposite_unlink(graph, &end_point, related)?);
        }
        own.push(EndPoint::Real(end_point).create_delete_command(graph)?);
    }

    tracing::debug!(
        entity_id = %entity,
        unlinks = unlinks.len(),
        own_end_points = own.len(),
        "built delete command"
    );
    Ok(ExpandedCommand::new(unlinks).combine(ExpandedCommand::new(own)))
}

/// Remove `entity` from the end point on `related` that points back at it
fn opposite_unlink(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    related: &EntityId,
) -> Result<Command> {
    let opposite = graph.opposite_end_point(end_point, Some(related))?;
    let EndPoint::Real(opposite_id) = &opposite else {
        return Ok(Command::Noop);
    };
    match graph.end_point_definition(opposite_id)?.cardinality {
        Cardinality::Many => {
            if graph.related_objects(opposite_id)?.contains(&end_point.entity_id) {
                opposite.create_remove_command(graph, &end_point.entity_id)
            } else {
                Ok(Command::Noop)
            }
        }
        Cardinality::One => back_reference_command(graph, opposite_id.clone(), None),
    }
}
