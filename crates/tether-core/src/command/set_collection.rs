//! Whole-collection replacement
//!
//! `customer.orders = new_collection` swaps the collection object associated
//! with the end point. The added and removed sets are computed once when the
//! command is built; members present in both collections raise no events.

use std::collections::HashSet;

use tether_core_types::EntityId;

use super::collection::{back_reference_of, detach_from_previous_owner};
use super::object_set::{back_reference_command, opposite_back_reference};
use super::{require_cardinality, require_related_type, Command, RelationChangeEvent};
use crate::diff::CollectionDiff;
use crate::end_point::EndPoint;
use crate::errors::{RelationError, Result};
use crate::graph::{CollectionId, RelationGraph};
use crate::model::{Cardinality, RelationEndPointId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCollection {
    pub(crate) end_point: RelationEndPointId,
    /// Collection associated at construction; `None` if not yet materialized
    pub(crate) old_collection: Option<CollectionId>,
    pub(crate) new_collection: CollectionId,
    pub(crate) new_items: Vec<EntityId>,
    pub(crate) diff: CollectionDiff,
}

impl SetCollection {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn new_collection(&self) -> &CollectionId {
        &self.new_collection
    }

    pub fn added(&self) -> &[EntityId] {
        &self.diff.added
    }

    pub fn removed(&self) -> &[EntityId] {
        &self.diff.removed
    }

    /// One `old -> null` per removed item, then one `null -> new` per added item
    pub(crate) fn begin_events(&self) -> Vec<RelationChangeEvent> {
        let removed = self
            .diff
            .removed
            .iter()
            .map(|item| RelationChangeEvent::new(&self.end_point, Some(item.clone()), None));
        let added = self
            .diff
            .added
            .iter()
            .map(|item| RelationChangeEvent::new(&self.end_point, None, Some(item.clone())));
        removed.chain(added).collect()
    }

    /// Added items in reverse, then removed items in reverse
    pub(crate) fn end_events(&self) -> Vec<RelationChangeEvent> {
        let added = self
            .diff
            .added
            .iter()
            .rev()
            .map(|item| RelationChangeEvent::new(&self.end_point, None, Some(item.clone())));
        let removed = self
            .diff
            .removed
            .iter()
            .rev()
            .map(|item| RelationChangeEvent::new(&self.end_point, Some(item.clone()), None));
        added.chain(removed).collect()
    }

    pub(crate) fn perform(&self, graph: &mut RelationGraph) -> Result<()> {
        graph.replace_collection(
            &self.end_point,
            self.old_collection.as_ref(),
            &self.new_collection,
            &self.new_items,
        )
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::Many)?;
        check_new_collection(graph, &self.end_point, &self.new_collection)?;
        check_items(graph, &self.end_point, &self.new_items)
    }
}

impl Command {
    /// Replace the collection associated with `end_point` by `new_collection`
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` if the handle is unknown, `InvalidArgument`
    /// if the collection is already associated with an end point or holds
    /// duplicates, or `RelatedTypeMismatch` if a member is of the wrong type.
    pub fn set_collection(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        new_collection: &CollectionId,
    ) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::Many)?;
        check_new_collection(graph, &end_point, new_collection)?;
        let new_items = graph.collection_items(new_collection)?;
        check_items(graph, &end_point, &new_items)?;

        let old_items = graph.related_objects(&end_point)?;
        let diff = CollectionDiff::compute(old_items, &new_items);

        Ok(Command::SetCollection(SetCollection {
            old_collection: graph.collection_of(&end_point).cloned(),
            end_point,
            new_collection: new_collection.clone(),
            new_items,
            diff,
        }))
    }
}

fn check_new_collection(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    collection: &CollectionId,
) -> Result<()> {
    match graph.collection_association(collection)? {
        None => Ok(()),
        Some(associated) if associated == end_point => Err(RelationError::invalid_argument(
            "new_collection",
            format!("collection {} is already associated with {}", collection, end_point),
        )),
        Some(associated) => Err(RelationError::invalid_argument(
            "new_collection",
            format!(
                "collection {} belongs to {}, cannot associate it with {}",
                collection, associated, end_point
            ),
        )),
    }
}

fn check_items(graph: &RelationGraph, end_point: &RelationEndPointId, items: &[EntityId]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(RelationError::invalid_argument(
                "new_collection",
                format!("{} appears more than once", item),
            ));
        }
        require_related_type(graph, end_point, item)?;
    }
    Ok(())
}

/// Removed back-references cleared, then per added item `(detach, set back-reference)`, then this
pub(crate) fn expand(set: &SetCollection, graph: &RelationGraph) -> Result<Vec<Command>> {
    let owner = &set.end_point.entity_id;
    let mut commands = Vec::with_capacity(set.diff.removed.len() + 2 * set.diff.added.len() + 1);

    for removed in &set.diff.removed {
        commands.push(opposite_back_reference(graph, &set.end_point, Some(removed), None)?);
    }

    for added in &set.diff.added {
        match back_reference_of(graph, &set.end_point, added)? {
            EndPoint::Real(back) => {
                commands.push(detach_from_previous_owner(graph, &back, owner)?);
                commands.push(back_reference_command(graph, back, Some(owner.clone()))?);
            }
            EndPoint::Null => {
                commands.push(Command::Noop);
                commands.push(Command::Noop);
            }
        }
    }

    commands.push(Command::SetCollection(set.clone()));
    Ok(commands)
}
