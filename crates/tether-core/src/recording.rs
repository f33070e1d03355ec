//! Recording observer
//!
//! [`EventRecorder`] implements all three observer channels and appends
//! every notification to a shared, ordered log. Clones share the log, so one
//! clone can be handed to a transaction while another is inspected.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core_types::EntityId;

use crate::command::RelationChangeEvent;
use crate::errors::{RelationError, Result};
use crate::model::RelationEndPointId;
use crate::observer::{EndPointStateListener, EntityHooks, TransactionListener};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// Entity hook, Begin phase
    Changing(RelationChangeEvent),
    /// Entity hook, End phase
    Changed(RelationChangeEvent),
    /// Transaction listener, NotifyBegin phase
    TransactionChanging(RelationChangeEvent),
    /// Transaction listener, NotifyEnd phase
    TransactionChanged(RelationChangeEvent),
    StateUpdated {
        end_point: RelationEndPointId,
        has_changed: Option<bool>,
    },
}

impl RecordedEvent {
    /// Relation change carried by the event, if any
    pub fn change(&self) -> Option<&RelationChangeEvent> {
        match self {
            RecordedEvent::Changing(change)
            | RecordedEvent::Changed(change)
            | RecordedEvent::TransactionChanging(change)
            | RecordedEvent::TransactionChanged(change) => Some(change),
            RecordedEvent::StateUpdated { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
    /// `(entity, property)` whose `on_relation_changing` hook fails
    reject: Option<(EntityId, String)>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the entity hook reject changes to `entity.property`
    pub fn rejecting(mut self, entity: EntityId, property: impl Into<String>) -> Self {
        self.reject = Some((entity, property.into()));
        self
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    /// Entity-level Begin events only
    pub fn changing(&self) -> Vec<RelationChangeEvent> {
        self.filtered(|event| match event {
            RecordedEvent::Changing(change) => Some(change.clone()),
            _ => None,
        })
    }

    /// Entity-level End events only
    pub fn changed(&self) -> Vec<RelationChangeEvent> {
        self.filtered(|event| match event {
            RecordedEvent::Changed(change) => Some(change.clone()),
            _ => None,
        })
    }

    pub fn transaction_changing(&self) -> Vec<RelationChangeEvent> {
        self.filtered(|event| match event {
            RecordedEvent::TransactionChanging(change) => Some(change.clone()),
            _ => None,
        })
    }

    pub fn transaction_changed(&self) -> Vec<RelationChangeEvent> {
        self.filtered(|event| match event {
            RecordedEvent::TransactionChanged(change) => Some(change.clone()),
            _ => None,
        })
    }

    pub fn state_updates(&self) -> Vec<(RelationEndPointId, Option<bool>)> {
        self.filtered(|event| match event {
            RecordedEvent::StateUpdated {
                end_point,
                has_changed,
            } => Some((end_point.clone(), *has_changed)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn filtered<T>(&self, select: impl Fn(&RecordedEvent) -> Option<T>) -> Vec<T> {
        self.events.borrow().iter().filter_map(select).collect()
    }

    fn record(&self, event: RecordedEvent) {
        self.events.borrow_mut().push(event);
    }
}

fn change(
    entity: &EntityId,
    property: &str,
    old: Option<&EntityId>,
    new: Option<&EntityId>,
) -> RelationChangeEvent {
    RelationChangeEvent {
        entity: entity.clone(),
        property: property.to_string(),
        old: old.cloned(),
        new: new.cloned(),
    }
}

impl EntityHooks for EventRecorder {
    fn on_relation_changing(
        &mut self,
        entity: &EntityId,
        property: &str,
        old: Option<&EntityId>,
        new: Option<&EntityId>,
    ) -> Result<()> {
        if let Some((rejected_entity, rejected_property)) = &self.reject {
            if rejected_entity == entity && rejected_property == property {
                return Err(RelationError::HandlerFailed {
                    entity_id: entity.to_string(),
                    property: property.to_string(),
                    message: "change rejected by handler".to_string(),
                });
            }
        }
        self.record(RecordedEvent::Changing(change(entity, property, old, new)));
        Ok(())
    }

    fn on_relation_changed(
        &mut self,
        entity: &EntityId,
        property: &str,
        old: Option<&EntityId>,
        new: Option<&EntityId>,
    ) -> Result<()> {
        self.record(RecordedEvent::Changed(change(entity, property, old, new)));
        Ok(())
    }
}

impl TransactionListener for EventRecorder {
    fn relation_changing(
        &mut self,
        entity: &EntityId,
        property: &str,
        old: Option<&EntityId>,
        new: Option<&EntityId>,
    ) -> Result<()> {
        self.record(RecordedEvent::TransactionChanging(change(entity, property, old, new)));
        Ok(())
    }

    fn relation_changed(
        &mut self,
        entity: &EntityId,
        property: &str,
        old: Option<&EntityId>,
        new: Option<&EntityId>,
    ) -> Result<()> {
        self.record(RecordedEvent::TransactionChanged(change(entity, property, old, new)));
        Ok(())
    }
}

impl EndPointStateListener for EventRecorder {
    fn virtual_end_point_state_updated(&mut self, end_point: &RelationEndPointId, has_changed: Option<bool>) {
        self.record(RecordedEvent::StateUpdated {
            end_point: end_point.clone(),
            has_changed,
        });
    }
}
