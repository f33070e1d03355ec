//! Commands modifying single members of a collection end point

use tether_core_types::EntityId;

use super::object_set::{back_reference_command, opposite_back_reference};
use super::{require_cardinality, require_related_type, Command, RelationChangeEvent};
use crate::end_point::EndPoint;
use crate::errors::{RelationError, Result};
use crate::graph::RelationGraph;
use crate::model::{Cardinality, RelationEndPointId};

/// Insert `item` at `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInsert {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) index: usize,
    pub(crate) item: EntityId,
}

/// Remove `item`, found at `index` when the command was built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRemove {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) index: usize,
    pub(crate) item: EntityId,
}

/// Replace `old_item` at `index` with `new_item`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReplace {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) index: usize,
    pub(crate) old_item: EntityId,
    pub(crate) new_item: EntityId,
}

/// Replace `item` at `index` with itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReplaceSame {
    pub(crate) end_point: RelationEndPointId,
    pub(crate) index: usize,
    pub(crate) item: EntityId,
}

impl CollectionInsert {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn item(&self) -> &EntityId {
        &self.item
    }

    pub(crate) fn event(&self) -> RelationChangeEvent {
        RelationChangeEvent::new(&self.end_point, None, Some(self.item.clone()))
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::Many)?;
        require_related_type(graph, &self.end_point, &self.item)?;
        let items = graph.related_objects(&self.end_point)?;
        check_insert_position(&self.end_point, items, self.index)?;
        check_not_member(&self.end_point, items, &self.item)
    }
}

impl CollectionRemove {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn item(&self) -> &EntityId {
        &self.item
    }

    pub(crate) fn event(&self) -> RelationChangeEvent {
        RelationChangeEvent::new(&self.end_point, Some(self.item.clone()), None)
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::Many)?;
        let items = graph.related_objects(&self.end_point)?;
        position_of(&self.end_point, items, &self.item).map(|_| ())
    }
}

impl CollectionReplace {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn old_item(&self) -> &EntityId {
        &self.old_item
    }

    pub fn new_item(&self) -> &EntityId {
        &self.new_item
    }

    pub(crate) fn event(&self) -> RelationChangeEvent {
        RelationChangeEvent::new(
            &self.end_point,
            Some(self.old_item.clone()),
            Some(self.new_item.clone()),
        )
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::Many)?;
        require_related_type(graph, &self.end_point, &self.new_item)?;
        let items = graph.related_objects(&self.end_point)?;
        let current = item_at(&self.end_point, items, self.index)?;
        if current != &self.old_item {
            return Err(RelationError::ItemNotInCollection {
                end_point: self.end_point.to_string(),
                item_id: self.old_item.to_string(),
            });
        }
        check_not_member(&self.end_point, items, &self.new_item)
    }
}

impl CollectionReplaceSame {
    pub fn end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub fn item(&self) -> &EntityId {
        &self.item
    }

    pub(crate) fn validate(&self, graph: &RelationGraph) -> Result<()> {
        require_cardinality(graph, &self.end_point, Cardinality::Many)?;
        let items = graph.related_objects(&self.end_point)?;
        item_at(&self.end_point, items, self.index).map(|_| ())
    }
}

impl Command {
    /// Insert `item` into a collection end point at `index`
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index > len`, `InvalidArgument` if the
    /// end point is not a collection or already contains `item`, or
    /// `RelatedTypeMismatch` if `item` is of the wrong type.
    pub fn collection_insert(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        index: usize,
        item: EntityId,
    ) -> Result<Command> {
        let insert = CollectionInsert {
            end_point,
            index,
            item,
        };
        insert.validate(graph)?;
        Ok(Command::CollectionInsert(insert))
    }

    /// Remove `item` from a collection end point
    ///
    /// # Errors
    ///
    /// Returns `ItemNotInCollection` if `item` is not a member.
    pub fn collection_remove(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        item: &EntityId,
    ) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::Many)?;
        let index = position_of(&end_point, graph.related_objects(&end_point)?, item)?;
        Ok(Command::CollectionRemove(CollectionRemove {
            end_point,
            index,
            item: item.clone(),
        }))
    }

    /// Replace the member at `index` with `item`
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len`, or `InvalidArgument` if
    /// `item` already sits at `index` (use
    /// [`Command::collection_replace_same`]) or elsewhere in the collection.
    pub fn collection_replace(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        index: usize,
        item: EntityId,
    ) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::Many)?;
        let old_item = item_at(&end_point, graph.related_objects(&end_point)?, index)?.clone();
        if old_item == item {
            return Err(RelationError::invalid_argument(
                "new_related",
                format!(
                    "{} already holds {} at index {}, use the self-replace command",
                    end_point, item, index
                ),
            ));
        }
        let replace = CollectionReplace {
            end_point,
            index,
            old_item,
            new_item: item,
        };
        replace.validate(graph)?;
        Ok(Command::CollectionReplace(replace))
    }

    /// Replace the member at `index` with itself
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len`.
    pub fn collection_replace_same(
        graph: &RelationGraph,
        end_point: RelationEndPointId,
        index: usize,
    ) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::Many)?;
        let item = item_at(&end_point, graph.related_objects(&end_point)?, index)?.clone();
        Ok(Command::CollectionReplaceSame(CollectionReplaceSame {
            end_point,
            index,
            item,
        }))
    }

    /// Clear a collection end point of an owner being deleted
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the end point is not a collection.
    pub fn collection_delete(graph: &RelationGraph, end_point: RelationEndPointId) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::Many)?;
        Ok(Command::CollectionDelete(end_point))
    }

    /// Clear an object end point of an owner being deleted
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the end point is not an object end point.
    pub fn object_delete(graph: &RelationGraph, end_point: RelationEndPointId) -> Result<Command> {
        require_cardinality(graph, &end_point, Cardinality::One)?;
        Ok(Command::ObjectDelete(end_point))
    }
}

fn check_insert_position(end_point: &RelationEndPointId, items: &[EntityId], index: usize) -> Result<()> {
    if index > items.len() {
        return Err(RelationError::IndexOutOfRange {
            end_point: end_point.to_string(),
            index,
            len: items.len(),
        });
    }
    Ok(())
}

fn check_not_member(end_point: &RelationEndPointId, items: &[EntityId], item: &EntityId) -> Result<()> {
    if items.contains(item) {
        return Err(RelationError::invalid_argument(
            "new_related",
            format!("{} already contains {}", end_point, item),
        ));
    }
    Ok(())
}

fn position_of(end_point: &RelationEndPointId, items: &[EntityId], item: &EntityId) -> Result<usize> {
    items
        .iter()
        .position(|candidate| candidate == item)
        .ok_or_else(|| RelationError::ItemNotInCollection {
            end_point: end_point.to_string(),
            item_id: item.to_string(),
        })
}

fn item_at<'a>(end_point: &RelationEndPointId, items: &'a [EntityId], index: usize) -> Result<&'a EntityId> {
    items.get(index).ok_or_else(|| RelationError::IndexOutOfRange {
        end_point: end_point.to_string(),
        index,
        len: items.len(),
    })
}

/// Remove `item` from `collection`, or `Noop` if it is not a member
pub(crate) fn remove_member_command(
    graph: &RelationGraph,
    collection: RelationEndPointId,
    item: &EntityId,
) -> Result<Command> {
    let items = graph.related_objects(&collection)?;
    Ok(match items.iter().position(|candidate| candidate == item) {
        Some(index) => Command::CollectionRemove(CollectionRemove {
            end_point: collection,
            index,
            item: item.clone(),
        }),
        None => Command::Noop,
    })
}

/// Append `item` to `collection`, or `Noop` if it is already a member
pub(crate) fn add_member_command(
    graph: &RelationGraph,
    collection: RelationEndPointId,
    item: &EntityId,
) -> Result<Command> {
    let items = graph.related_objects(&collection)?;
    if items.contains(item) {
        return Ok(Command::Noop);
    }
    Ok(Command::CollectionInsert(CollectionInsert {
        index: items.len(),
        end_point: collection,
        item: item.clone(),
    }))
}

/// Remove `item` from the collection of the owner its back-reference points at
///
/// `Noop` when the back-reference is empty or already points at `owner`.
pub(crate) fn detach_from_previous_owner(
    graph: &RelationGraph,
    back: &RelationEndPointId,
    owner: &EntityId,
) -> Result<Command> {
    let previous = graph.related_object(back)?.filter(|previous| previous != owner);
    match graph.opposite_end_point(back, previous.as_ref())? {
        EndPoint::Real(collection) => remove_member_command(graph, collection, &back.entity_id),
        EndPoint::Null => Ok(Command::Noop),
    }
}

/// Back-reference end point of `item` for the collection `end_point`
pub(crate) fn back_reference_of(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    item: &EntityId,
) -> Result<EndPoint> {
    graph.opposite_end_point(end_point, Some(item))
}

/// `[item's back-reference -> owner, this, remove item from its previous owner]`
pub(crate) fn expand_insert(insert: &CollectionInsert, graph: &RelationGraph) -> Result<Vec<Command>> {
    let owner = &insert.end_point.entity_id;
    let (set_back, detach) = match back_reference_of(graph, &insert.end_point, &insert.item)? {
        EndPoint::Real(back) => (
            back_reference_command(graph, back.clone(), Some(owner.clone()))?,
            detach_from_previous_owner(graph, &back, owner)?,
        ),
        EndPoint::Null => (Command::Noop, Command::Noop),
    };
    Ok(vec![set_back, Command::CollectionInsert(insert.clone()), detach])
}

/// `[removed item's back-reference -> null, this]`
pub(crate) fn expand_remove(remove: &CollectionRemove, graph: &RelationGraph) -> Result<Vec<Command>> {
    Ok(vec![
        opposite_back_reference(graph, &remove.end_point, Some(&remove.item), None)?,
        Command::CollectionRemove(remove.clone()),
    ])
}

/// `[old item's back-reference -> null, new item's back-reference -> owner, this, remove new item from its previous owner]`
pub(crate) fn expand_replace(replace: &CollectionReplace, graph: &RelationGraph) -> Result<Vec<Command>> {
    let owner = &replace.end_point.entity_id;
    let clear_old = opposite_back_reference(graph, &replace.end_point, Some(&replace.old_item), None)?;
    let (set_new, detach) = match back_reference_of(graph, &replace.end_point, &replace.new_item)? {
        EndPoint::Real(back) => (
            back_reference_command(graph, back.clone(), Some(owner.clone()))?,
            detach_from_previous_owner(graph, &back, owner)?,
        ),
        EndPoint::Null => (Command::Noop, Command::Noop),
    };
    Ok(vec![
        clear_old,
        set_new,
        Command::CollectionReplace(replace.clone()),
        detach,
    ])
}

/// `[this, touch of the item's back-reference]`
pub(crate) fn expand_replace_same(
    same: &CollectionReplaceSame,
    graph: &RelationGraph,
) -> Result<Vec<Command>> {
    let mut commands = vec![Command::CollectionReplaceSame(same.clone())];
    if let EndPoint::Real(back) = back_reference_of(graph, &same.end_point, &same.item)? {
        commands.push(Command::Touch(back));
    }
    Ok(commands)
}
