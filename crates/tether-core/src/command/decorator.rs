//! Virtual end point state notification
//!
//! Wraps a command so that, once its Perform phase completes, the change
//! state of a watched end point is reported to the
//! [`EndPointStateListener`](crate::observer::EndPointStateListener).

use super::Command;
use crate::errors::Result;
use crate::graph::RelationGraph;
use crate::model::RelationEndPointId;
use crate::observer::ExecutionContext;

/// Computes the reported change state of an end point
pub type StateProjection = fn(&RelationGraph, &RelationEndPointId) -> Option<bool>;

/// Default projection: whether the end point differs from its original value
pub fn has_changed_projection(graph: &RelationGraph, end_point: &RelationEndPointId) -> Option<bool> {
    graph.has_changed(end_point)
}

#[derive(Debug, Clone)]
pub struct StateUpdateRaising {
    inner: Box<Command>,
    end_point: RelationEndPointId,
    projection: StateProjection,
}

impl StateUpdateRaising {
    pub fn inner(&self) -> &Command {
        &self.inner
    }

    /// End point whose state is reported
    pub fn watched_end_point(&self) -> &RelationEndPointId {
        &self.end_point
    }

    pub(crate) fn perform(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.inner.perform(ctx)?;
        let state = (self.projection)(ctx.graph, &self.end_point);
        ctx.state_listener
            .virtual_end_point_state_updated(&self.end_point, state);
        Ok(())
    }

    /// Every element of the inner expansion, wrapped individually
    pub(crate) fn expand(&self, graph: &RelationGraph) -> Result<Vec<Command>> {
        Ok(self
            .inner
            .expand(graph)?
            .into_iter()
            .map(|command| command.raising_state_updates(self.end_point.clone(), self.projection))
            .collect())
    }
}

impl Command {
    /// Whether a decorator anywhere in this command watches `end_point`
    pub fn reports_state_of(&self, end_point: &RelationEndPointId) -> bool {
        match self {
            Command::StateUpdateRaising(decorated) => {
                &decorated.end_point == end_point || decorated.inner.reports_state_of(end_point)
            }
            _ => false,
        }
    }

    /// Report the state of `end_point` after this command performs
    pub fn raising_state_updates(
        self,
        end_point: RelationEndPointId,
        projection: StateProjection,
    ) -> Command {
        Command::StateUpdateRaising(StateUpdateRaising {
            inner: Box::new(self),
            end_point,
            projection,
        })
    }
}
