//! Observer channels and the execution context
//!
//! Commands report relation changes on two channels:
//!
//! - entity level ([`EntityHooks`]), raised from the Begin and End phases
//! - transaction level ([`TransactionListener`]), raised from NotifyBegin and
//!   NotifyEnd
//!
//! A third channel ([`EndPointStateListener`]) receives change-state updates
//! for virtual end points from the notification decorator.
//!
//! Every method has an empty default so observers implement only what they
//! care about. A returned error aborts the running phase and is propagated
//! unmodified.

use tether_core_types::EntityId;

use crate::errors::Result;
use crate::graph::RelationGraph;
use crate::model::RelationEndPointId;

/// Entity-level relation hooks (Begin / End)
pub trait EntityHooks {
    /// A relation property of `entity` is about to change
    fn on_relation_changing(
        &mut self,
        _entity: &EntityId,
        _property: &str,
        _old: Option<&EntityId>,
        _new: Option<&EntityId>,
    ) -> Result<()> {
        Ok(())
    }

    /// A relation property of `entity` has changed
    fn on_relation_changed(
        &mut self,
        _entity: &EntityId,
        _property: &str,
        _old: Option<&EntityId>,
        _new: Option<&EntityId>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Transaction-level relation listener (NotifyBegin / NotifyEnd)
pub trait TransactionListener {
    fn relation_changing(
        &mut self,
        _entity: &EntityId,
        _property: &str,
        _old: Option<&EntityId>,
        _new: Option<&EntityId>,
    ) -> Result<()> {
        Ok(())
    }

    fn relation_changed(
        &mut self,
        _entity: &EntityId,
        _property: &str,
        _old: Option<&EntityId>,
        _new: Option<&EntityId>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Receives the change state of virtual end points after they are performed
pub trait EndPointStateListener {
    /// `has_changed` is `None` when the end point state is not materialized
    fn virtual_end_point_state_updated(
        &mut self,
        _end_point: &RelationEndPointId,
        _has_changed: Option<bool>,
    ) {
    }
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EntityHooks for NoopObserver {}
impl TransactionListener for NoopObserver {}
impl EndPointStateListener for NoopObserver {}

/// Everything a command phase may touch
///
/// Passed explicitly to each phase; commands never hold on to it.
pub struct ExecutionContext<'a> {
    pub graph: &'a mut RelationGraph,
    pub hooks: &'a mut dyn EntityHooks,
    pub listener: &'a mut dyn TransactionListener,
    pub state_listener: &'a mut dyn EndPointStateListener,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        graph: &'a mut RelationGraph,
        hooks: &'a mut dyn EntityHooks,
        listener: &'a mut dyn TransactionListener,
        state_listener: &'a mut dyn EndPointStateListener,
    ) -> Self {
        Self {
            graph,
            hooks,
            listener,
            state_listener,
        }
    }
}
