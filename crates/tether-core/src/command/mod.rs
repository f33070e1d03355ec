//! Relation commands
//!
//! A [`Command`] is a single relation mutation with a five-phase lifecycle:
//!
//! 1. `notify_begin` - transaction listener `relation_changing`
//! 2. `begin` - entity hook `on_relation_changing`
//! 3. `perform` - the only phase that mutates the graph; always touches
//! 4. `end` - entity hook `on_relation_changed`
//! 5. `notify_end` - transaction listener `relation_changed`
//!
//! Commands are built against the current graph (which never mutates it),
//! expanded into every command needed to keep both ends of the relation
//! consistent, and executed once through an [`ExpandedCommand`].
//!
//! ## Example
//!
//! ```
//! use tether_core::command::Command;
//! use tether_core::config::MappingConfiguration;
//! use tether_core::graph::RelationGraph;
//! use tether_core::model::RelationEndPointId;
//! use tether_core::observer::{ExecutionContext, NoopObserver};
//!
//! let mapping = MappingConfiguration::builder()
//!     .entity_type("Order")
//!     .entity_type("Customer")
//!     .one_to_many("Order:Customer", ("Order", "Customer"), ("Customer", "Orders"))
//!     .build()
//!     .unwrap();
//! let mut graph = RelationGraph::new(mapping);
//! let order = graph.new_entity("Order").unwrap();
//! let customer = graph.new_entity("Customer").unwrap();
//!
//! let end_point = RelationEndPointId::new(order.clone(), "Customer");
//! let command = Command::set_one_many(&graph, end_point, Some(customer.clone())).unwrap();
//! let expanded = command.expand(&graph).unwrap();
//!
//! let (mut hooks, mut listener, mut states) = (NoopObserver, NoopObserver, NoopObserver);
//! let mut ctx = ExecutionContext::new(&mut graph, &mut hooks, &mut listener, &mut states);
//! expanded.execute(&mut ctx).unwrap();
//!
//! let orders = RelationEndPointId::new(customer, "Orders");
//! assert_eq!(graph.related_objects(&orders).unwrap(), &[order]);
//! ```
//!
//! [`ExpandedCommand`]: crate::expanded::ExpandedCommand

pub mod collection;
pub mod decorator;
pub mod object_set;
pub mod set_collection;

use tether_core_types::schema::{
    PHASE_BEGIN, PHASE_END, PHASE_NOTIFY_BEGIN, PHASE_NOTIFY_END, PHASE_PERFORM,
};
use tether_core_types::EntityId;

pub use collection::{CollectionInsert, CollectionRemove, CollectionReplace, CollectionReplaceSame};
pub use decorator::{has_changed_projection, StateProjection, StateUpdateRaising};
pub use object_set::{ObjectSet, SetSame};
pub use set_collection::SetCollection;

use crate::errors::{RelationError, Result};
use crate::expanded::ExpandedCommand;
use crate::graph::RelationGraph;
use crate::model::{Cardinality, EndPointDefinition, RelationEndPointId};
use crate::observer::ExecutionContext;

/// A single relation mutation
#[derive(Debug, Clone)]
pub enum Command {
    /// Assign the object end of a one-to-one relation
    SetOneOne(ObjectSet),
    /// Assign the object end of a one-to-many relation
    SetOneMany(ObjectSet),
    /// Assign a reference whose opposite end is anonymous
    SetUnidirectional(ObjectSet),
    /// Assign an object end the value it already holds
    SetSame(SetSame),
    CollectionInsert(CollectionInsert),
    CollectionRemove(CollectionRemove),
    /// `list[i] = x`
    CollectionReplace(CollectionReplace),
    /// `list[i] = list[i]`
    CollectionReplaceSame(CollectionReplaceSame),
    /// Clear a collection end point of a deleted owner
    CollectionDelete(RelationEndPointId),
    /// Clear an object end point of a deleted owner
    ObjectDelete(RelationEndPointId),
    /// Replace the whole collection associated with an end point
    SetCollection(SetCollection),
    /// Mark an end point as touched
    Touch(RelationEndPointId),
    Noop,
    /// Report the state of a virtual end point after the inner command performs
    StateUpdateRaising(StateUpdateRaising),
}

/// One relation change as seen by hooks and listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationChangeEvent {
    pub entity: EntityId,
    pub property: String,
    pub old: Option<EntityId>,
    pub new: Option<EntityId>,
}

impl RelationChangeEvent {
    pub fn new(end_point: &RelationEndPointId, old: Option<EntityId>, new: Option<EntityId>) -> Self {
        Self {
            entity: end_point.entity_id.clone(),
            property: end_point.property.clone(),
            old,
            new,
        }
    }
}

impl Command {
    /// Mark `end_point` as touched without raising events
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the end point does not exist.
    pub fn touch(graph: &RelationGraph, end_point: RelationEndPointId) -> Result<Command> {
        live_definition(graph, &end_point)?;
        Ok(Command::Touch(end_point))
    }

    /// Stable name of the variant, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetOneOne(_) => "set_one_one",
            Command::SetOneMany(_) => "set_one_many",
            Command::SetUnidirectional(_) => "set_unidirectional",
            Command::SetSame(_) => "set_same",
            Command::CollectionInsert(_) => "collection_insert",
            Command::CollectionRemove(_) => "collection_remove",
            Command::CollectionReplace(_) => "collection_replace",
            Command::CollectionReplaceSame(_) => "collection_replace_same",
            Command::CollectionDelete(_) => "collection_delete",
            Command::ObjectDelete(_) => "object_delete",
            Command::SetCollection(_) => "set_collection",
            Command::Touch(_) => "touch",
            Command::Noop => "noop",
            Command::StateUpdateRaising(_) => "state_update_raising",
        }
    }

    /// End point modified by the command; `None` for `Noop`
    pub fn end_point(&self) -> Option<&RelationEndPointId> {
        match self {
            Command::SetOneOne(set) | Command::SetOneMany(set) | Command::SetUnidirectional(set) => {
                Some(&set.end_point)
            }
            Command::SetSame(same) => Some(&same.end_point),
            Command::CollectionInsert(insert) => Some(&insert.end_point),
            Command::CollectionRemove(remove) => Some(&remove.end_point),
            Command::CollectionReplace(replace) => Some(&replace.end_point),
            Command::CollectionReplaceSame(same) => Some(&same.end_point),
            Command::CollectionDelete(end_point)
            | Command::ObjectDelete(end_point)
            | Command::Touch(end_point) => Some(end_point),
            Command::SetCollection(set) => Some(&set.end_point),
            Command::Noop => None,
            Command::StateUpdateRaising(decorated) => decorated.inner().end_point(),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Command::Noop)
    }

    /// Events raised by NotifyBegin and Begin, in raise order
    pub fn begin_events(&self) -> Vec<RelationChangeEvent> {
        match self {
            Command::SetOneOne(set) | Command::SetOneMany(set) | Command::SetUnidirectional(set) => {
                vec![set.event()]
            }
            Command::CollectionInsert(insert) => vec![insert.event()],
            Command::CollectionRemove(remove) => vec![remove.event()],
            Command::CollectionReplace(replace) => vec![replace.event()],
            Command::SetCollection(set) => set.begin_events(),
            Command::StateUpdateRaising(decorated) => decorated.inner().begin_events(),
            Command::SetSame(_)
            | Command::CollectionReplaceSame(_)
            | Command::CollectionDelete(_)
            | Command::ObjectDelete(_)
            | Command::Touch(_)
            | Command::Noop => Vec::new(),
        }
    }

    /// Events raised by End and NotifyEnd, in raise order
    pub fn end_events(&self) -> Vec<RelationChangeEvent> {
        match self {
            Command::SetCollection(set) => set.end_events(),
            Command::StateUpdateRaising(decorated) => decorated.inner().end_events(),
            _ => self.begin_events(),
        }
    }

    pub fn notify_begin(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.trace_phase(PHASE_NOTIFY_BEGIN);
        for event in self.begin_events() {
            ctx.listener.relation_changing(
                &event.entity,
                &event.property,
                event.old.as_ref(),
                event.new.as_ref(),
            )?;
        }
        Ok(())
    }

    pub fn begin(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.trace_phase(PHASE_BEGIN);
        for event in self.begin_events() {
            ctx.hooks.on_relation_changing(
                &event.entity,
                &event.property,
                event.old.as_ref(),
                event.new.as_ref(),
            )?;
        }
        Ok(())
    }

    /// Apply the mutation to the graph and touch the modified end point
    pub fn perform(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.trace_phase(PHASE_PERFORM);
        match self {
            Command::SetOneOne(set) | Command::SetOneMany(set) | Command::SetUnidirectional(set) => {
                ctx.graph.set_related_object(&set.end_point, set.new.clone())
            }
            Command::SetSame(same) => ctx.graph.touch(&same.end_point),
            Command::CollectionInsert(insert) => {
                ctx.graph
                    .insert_related_object(&insert.end_point, insert.index, insert.item.clone())
            }
            Command::CollectionRemove(remove) => {
                ctx.graph
                    .remove_related_object(&remove.end_point, remove.index, &remove.item)
            }
            Command::CollectionReplace(replace) => ctx.graph.replace_related_object(
                &replace.end_point,
                replace.index,
                replace.new_item.clone(),
            ),
            Command::CollectionReplaceSame(same) => ctx.graph.touch(&same.end_point),
            Command::CollectionDelete(end_point) | Command::ObjectDelete(end_point) => {
                ctx.graph.clear_end_point(end_point)
            }
            Command::SetCollection(set) => set.perform(ctx.graph),
            Command::Touch(end_point) => ctx.graph.touch(end_point),
            Command::Noop => Ok(()),
            Command::StateUpdateRaising(decorated) => decorated.perform(ctx),
        }
    }

    pub fn end(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.trace_phase(PHASE_END);
        for event in self.end_events() {
            ctx.hooks.on_relation_changed(
                &event.entity,
                &event.property,
                event.old.as_ref(),
                event.new.as_ref(),
            )?;
        }
        Ok(())
    }

    pub fn notify_end(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.trace_phase(PHASE_NOTIFY_END);
        for event in self.end_events() {
            ctx.listener.relation_changed(
                &event.entity,
                &event.property,
                event.old.as_ref(),
                event.new.as_ref(),
            )?;
        }
        Ok(())
    }

    /// Derive every command needed to keep both ends consistent
    ///
    /// The graph is only read; the expansion reflects its state at the time
    /// of the call.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if a participating end point cannot be resolved.
    pub fn expand(&self, graph: &RelationGraph) -> Result<ExpandedCommand> {
        let commands = match self {
            Command::SetOneOne(set) => object_set::expand_one_one(set, graph)?,
            Command::SetOneMany(set) => object_set::expand_one_many(set, graph)?,
            Command::SetSame(same) => object_set::expand_same(same, graph)?,
            Command::CollectionInsert(insert) => collection::expand_insert(insert, graph)?,
            Command::CollectionRemove(remove) => collection::expand_remove(remove, graph)?,
            Command::CollectionReplace(replace) => collection::expand_replace(replace, graph)?,
            Command::CollectionReplaceSame(same) => collection::expand_replace_same(same, graph)?,
            Command::SetCollection(set) => set_collection::expand(set, graph)?,
            Command::StateUpdateRaising(decorated) => decorated.expand(graph)?,
            Command::SetUnidirectional(_)
            | Command::CollectionDelete(_)
            | Command::ObjectDelete(_)
            | Command::Touch(_)
            | Command::Noop => vec![self.clone()],
        };

        tracing::debug!(
            command_kind = self.kind(),
            expansion_len = commands.len(),
            "expanded command"
        );
        Ok(ExpandedCommand::new(commands))
    }

    /// Re-run the construction-time checks against the current graph
    ///
    /// # Errors
    ///
    /// Returns the first check that no longer holds.
    pub fn validate(&self, graph: &RelationGraph) -> Result<()> {
        match self {
            Command::SetOneOne(set) | Command::SetOneMany(set) | Command::SetUnidirectional(set) => {
                set.validate(graph)
            }
            Command::SetSame(same) => same.validate(graph),
            Command::CollectionInsert(insert) => insert.validate(graph),
            Command::CollectionRemove(remove) => remove.validate(graph),
            Command::CollectionReplace(replace) => replace.validate(graph),
            Command::CollectionReplaceSame(same) => same.validate(graph),
            Command::CollectionDelete(end_point) | Command::ObjectDelete(end_point) => {
                graph.end_point_definition(end_point).map(|_| ())
            }
            Command::SetCollection(set) => set.validate(graph),
            Command::Touch(end_point) => live_definition(graph, end_point).map(|_| ()),
            Command::Noop => Ok(()),
            Command::StateUpdateRaising(decorated) => decorated.inner().validate(graph),
        }
    }

    fn trace_phase(&self, phase: &'static str) {
        match self.end_point() {
            Some(end_point) => tracing::trace!(
                command_kind = self.kind(),
                phase = phase,
                entity_id = %end_point.entity_id,
                property = %end_point.property,
                "command phase"
            ),
            None => tracing::trace!(command_kind = self.kind(), phase = phase, "command phase"),
        }
    }
}

/// Definition of an end point whose owner is live
pub(crate) fn live_definition<'g>(
    graph: &'g RelationGraph,
    end_point: &RelationEndPointId,
) -> Result<&'g EndPointDefinition> {
    graph.entity(&end_point.entity_id)?;
    graph.end_point_definition(end_point)
}

/// Check the end point exists and has the expected cardinality
pub(crate) fn require_cardinality(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    expected: Cardinality,
) -> Result<()> {
    let definition = live_definition(graph, end_point)?;
    if definition.cardinality != expected {
        let message = match expected {
            Cardinality::One => format!("{} is not an object end point", end_point),
            Cardinality::Many => format!("{} is not a collection end point", end_point),
        };
        return Err(RelationError::invalid_argument("modified_end_point", message));
    }
    Ok(())
}

/// Check `related` is live and of the type expected on the opposite end
pub(crate) fn require_related_type(
    graph: &RelationGraph,
    end_point: &RelationEndPointId,
    related: &EntityId,
) -> Result<()> {
    let expected = &graph.opposite_definition(end_point)?.entity_type;
    let actual = &graph.entity(related)?.type_name;
    if actual != expected {
        return Err(RelationError::RelatedTypeMismatch {
            property: end_point.property.clone(),
            related_id: related.to_string(),
            expected_type: expected.clone(),
            actual_type: actual.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfiguration;

    fn graph() -> (RelationGraph, EntityId, EntityId) {
        let mapping = MappingConfiguration::builder()
            .entity_type("Order")
            .entity_type("Customer")
            .one_to_many("Order:Customer", ("Order", "Customer"), ("Customer", "Orders"))
            .build()
            .unwrap();
        let mut graph = RelationGraph::new(mapping);
        let order = graph.new_entity("Order").unwrap();
        let customer = graph.new_entity("Customer").unwrap();
        (graph, order, customer)
    }

    #[test]
    fn test_noop_expands_to_itself() {
        let (graph, _, _) = graph();
        let expanded = Command::Noop.expand(&graph).unwrap();
        assert_eq!(expanded.len(), 1);
        assert!(expanded.commands()[0].is_noop());
        assert!(Command::Noop.begin_events().is_empty());
        assert!(Command::Noop.end_point().is_none());
    }

    #[test]
    fn test_touch_raises_no_events() {
        let (graph, order, _) = graph();
        let command = Command::touch(&graph, RelationEndPointId::new(order, "Customer")).unwrap();
        assert_eq!(command.kind(), "touch");
        assert!(command.begin_events().is_empty());
        assert!(command.end_events().is_empty());
    }

    #[test]
    fn test_touch_unknown_property_fails() {
        let (graph, order, _) = graph();
        let result = Command::touch(&graph, RelationEndPointId::new(order, "Nope"));
        assert!(matches!(result, Err(RelationError::UnknownProperty { .. })));
    }

    #[test]
    fn test_require_related_type_mismatch() {
        let (graph, order, _) = graph();
        let other_order = order.clone();
        let end_point = RelationEndPointId::new(order, "Customer");
        let result = require_related_type(&graph, &end_point, &other_order);
        assert!(matches!(result, Err(RelationError::RelatedTypeMismatch { .. })));
    }
}
