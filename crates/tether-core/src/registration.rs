//! Registration of fetched relation data
//!
//! Loaded relation values enter the graph as both original and current
//! value, so they never count as changes. Back-references implied by the
//! loaded data are registered alongside and checked for conflicts.

use std::collections::HashSet;

use tether_core_types::EntityId;

use crate::end_point::EndPoint;
use crate::errors::{RelationError, Result};
use crate::graph::{EndPointState, RelationGraph};
use crate::model::{Cardinality, EndPointDefinition, RelationEndPointId};

/// Register the loaded value of an object end point owned by `owner`
///
/// When the opposite end is a one-to-one object end point, its
/// back-reference is registered too.
///
/// # Errors
///
/// - `EndPointTypeMismatch` if `definition` does not belong to `owner`'s type
/// - `RelatedTypeMismatch` if `related` is of the wrong type
/// - `DuplicateUniqueReference` if another entity already holds the
///   one-to-one back-reference of `related`
pub fn register_object(
    graph: &mut RelationGraph,
    definition: &EndPointDefinition,
    owner: &EntityId,
    related: Option<EntityId>,
) -> Result<()> {
    let end_point = owned_end_point(graph, definition, owner, Cardinality::One)?;
    if let Some(related) = &related {
        check_related(graph, &end_point, related)?;
        if let EndPoint::Real(back) = graph.opposite_end_point(&end_point, Some(related))? {
            if graph.end_point_definition(&back)?.cardinality == Cardinality::One {
                claim_unique_back_reference(graph, &back, owner)?;
            }
        }
    }

    tracing::debug!(end_point = %end_point, "registering object end point");
    graph.load_object(&end_point, related)
}

/// Register the fetched members of a virtual one-to-one end point
///
/// `fetched` lists every entity whose foreign key references `owner`; more
/// than one is a unique-constraint violation.
///
/// # Errors
///
/// - `EndPointTypeMismatch` if `definition` does not belong to `owner`'s type
/// - `InvalidArgument` if `definition` is not a virtual object end point
/// - `DuplicateUniqueReference` if `fetched` holds more than one entity
pub fn register_fetched_object(
    graph: &mut RelationGraph,
    definition: &EndPointDefinition,
    owner: &EntityId,
    fetched: &[EntityId],
) -> Result<()> {
    let end_point = owned_end_point(graph, definition, owner, Cardinality::One)?;
    if !definition.is_virtual {
        return Err(RelationError::invalid_argument(
            "definition",
            format!("{} is not a virtual end point", end_point),
        ));
    }
    if let [first, second, ..] = fetched {
        return Err(RelationError::DuplicateUniqueReference {
            property: end_point.property.clone(),
            owner_id: owner.to_string(),
            first_id: first.to_string(),
            second_id: second.to_string(),
        });
    }

    let related = fetched.first().cloned();
    if let Some(related) = &related {
        check_related(graph, &end_point, related)?;
        if let EndPoint::Real(back) = graph.opposite_end_point(&end_point, Some(related))? {
            claim_back_reference(graph, &back, owner)?;
            graph.load_object(&back, Some(owner.clone()))?;
        }
    }
    graph.load_object(&end_point, related)
}

/// Register the fetched members of a collection end point
///
/// The back-reference of every member is registered as pointing at `owner`.
///
/// # Errors
///
/// - `EndPointTypeMismatch` if `definition` does not belong to `owner`'s type
/// - `RelatedTypeMismatch` if a member is of the wrong type
/// - `InvalidArgument` if a member appears twice
/// - `ConflictingBackReference` if a member is already registered with
///   another owner
pub fn register_collection(
    graph: &mut RelationGraph,
    definition: &EndPointDefinition,
    owner: &EntityId,
    items: Vec<EntityId>,
) -> Result<()> {
    let end_point = owned_end_point(graph, definition, owner, Cardinality::Many)?;

    let mut seen = HashSet::new();
    let mut back_references = Vec::with_capacity(items.len());
    for item in &items {
        if !seen.insert(item) {
            return Err(RelationError::invalid_argument(
                "items",
                format!("{} appears more than once in {}", item, end_point),
            ));
        }
        check_related(graph, &end_point, item)?;
        if let EndPoint::Real(back) = graph.opposite_end_point(&end_point, Some(item))? {
            claim_back_reference(graph, &back, owner)?;
            back_references.push(back);
        }
    }

    for back in &back_references {
        graph.load_object(back, Some(owner.clone()))?;
    }
    tracing::debug!(end_point = %end_point, items = items.len(), "registering collection end point");
    graph.load_collection(&end_point, items)
}

fn owned_end_point(
    graph: &RelationGraph,
    definition: &EndPointDefinition,
    owner: &EntityId,
    expected: Cardinality,
) -> Result<RelationEndPointId> {
    let actual_type = graph.entity(owner)?.type_name.as_str();
    let property = definition.property.as_deref().ok_or_else(|| {
        RelationError::invalid_argument("definition", "anonymous end points hold no data")
    })?;
    if definition.entity_type != actual_type {
        return Err(RelationError::EndPointTypeMismatch {
            entity_type: definition.entity_type.clone(),
            property: property.to_string(),
            entity_id: owner.to_string(),
            actual_type: actual_type.to_string(),
        });
    }
    if definition.cardinality != expected {
        return Err(RelationError::invalid_argument(
            "definition",
            format!(
                "{}.{} has cardinality {:?}, expected {:?}",
                definition.entity_type, property, definition.cardinality, expected
            ),
        ));
    }
    let end_point = RelationEndPointId::new(owner.clone(), property);
    graph.end_point_definition(&end_point)?;
    Ok(end_point)
}

fn check_related(graph: &RelationGraph, end_point: &RelationEndPointId, related: &EntityId) -> Result<()> {
    let expected = &graph.opposite_definition(end_point)?.entity_type;
    let actual = graph.entity_type(related)?;
    if actual != expected.as_str() {
        return Err(RelationError::RelatedTypeMismatch {
            property: end_point.property.clone(),
            related_id: related.to_string(),
            expected_type: expected.clone(),
            actual_type: actual.to_string(),
        });
    }
    Ok(())
}

/// Registered value of an object end point, if it has been loaded
fn registered_object(graph: &RelationGraph, end_point: &RelationEndPointId) -> Option<EntityId> {
    match graph.end_point_state(end_point) {
        Some(EndPointState::Object(state)) => state.current.clone(),
        _ => None,
    }
}

fn claim_back_reference(graph: &RelationGraph, back: &RelationEndPointId, owner: &EntityId) -> Result<()> {
    match registered_object(graph, back) {
        Some(current) if &current != owner => Err(RelationError::ConflictingBackReference {
            property: back.property.clone(),
            item_id: back.entity_id.to_string(),
            current_owner_id: current.to_string(),
            new_owner_id: owner.to_string(),
        }),
        _ => Ok(()),
    }
}

fn claim_unique_back_reference(
    graph: &mut RelationGraph,
    back: &RelationEndPointId,
    owner: &EntityId,
) -> Result<()> {
    match registered_object(graph, back) {
        Some(current) if &current != owner => Err(RelationError::DuplicateUniqueReference {
            property: back.property.clone(),
            owner_id: back.entity_id.to_string(),
            first_id: current.to_string(),
            second_id: owner.to_string(),
        }),
        _ => graph.load_object(back, Some(owner.clone())),
    }
}
