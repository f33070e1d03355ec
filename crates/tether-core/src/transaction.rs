//! Relation transaction
//!
//! Owns the relation graph and the observers, and is the boundary at which
//! relation operations are logged.
//!
//! ## Logging Ownership
//!
//! - `log_op_start!` / `log_op_end!` / `log_op_error!` for `execute`,
//!   `delete_entity`, `commit` and `rollback`
//! - commands and the graph only emit `tracing::debug!` / `trace!`
//!
//! ## Atomicity
//!
//! Each `execute` and `delete_entity` either applies its whole expansion or
//! leaves the graph as it was. Notifications already delivered before a
//! failure are not retracted.

use std::time::Instant;

use tether_core_types::{CorrelationIds, EntityId};

use crate::change::{build_command, RelationChange};
use crate::command::{has_changed_projection, Command};
use crate::config::MappingConfiguration;
use crate::deletion::build_delete_command;
use crate::errors::{ExError, RelationError, Result};
use crate::expanded::ExpandedCommand;
use crate::graph::RelationGraph;
use crate::observer::{
    EndPointStateListener, EntityHooks, ExecutionContext, NoopObserver, TransactionListener,
};
use crate::{log_op_end, log_op_error, log_op_start};

pub struct RelationTransaction {
    graph: RelationGraph,
    hooks: Box<dyn EntityHooks>,
    listener: Box<dyn TransactionListener>,
    state_listener: Box<dyn EndPointStateListener>,
    correlation: CorrelationIds,
}

impl RelationTransaction {
    /// Start a transaction over an empty graph with no-op observers
    pub fn new(mapping: MappingConfiguration) -> Self {
        Self::with_graph(RelationGraph::new(mapping))
    }

    pub fn with_graph(graph: RelationGraph) -> Self {
        Self {
            graph,
            hooks: Box::new(NoopObserver),
            listener: Box::new(NoopObserver),
            state_listener: Box::new(NoopObserver),
            correlation: CorrelationIds::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: impl EntityHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_listener(mut self, listener: impl TransactionListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn with_state_listener(mut self, listener: impl EndPointStateListener + 'static) -> Self {
        self.state_listener = Box::new(listener);
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationIds) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn correlation(&self) -> &CorrelationIds {
        &self.correlation
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    /// Mutable graph access for entity and fetched-data registration
    pub fn graph_mut(&mut self) -> &mut RelationGraph {
        &mut self.graph
    }

    /// Apply one requested change with all its consequences
    ///
    /// # Errors
    ///
    /// Returns the construction error of the change, or the first error
    /// raised while executing its expansion. The graph is unchanged on error.
    pub fn execute(&mut self, change: &RelationChange) -> Result<()> {
        log_op_start!(
            "execute",
            transaction_id = %self.correlation.transaction_id,
            entity_id = %change.entity(),
            property = change.property(),
            change = change.op_name()
        );
        let start = Instant::now();

        let expansion_len = build_command(&self.graph, change)
            .and_then(|command| self.run(command))
            .map_err(|e| {
                log_op_error!(
                    "execute",
                    self.error_context(&e),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "execute",
            duration_ms = start.elapsed().as_millis() as u64,
            transaction_id = %self.correlation.transaction_id,
            expansion_len = expansion_len
        );
        Ok(())
    }

    /// Run an already built command
    ///
    /// # Errors
    ///
    /// Same as [`RelationTransaction::execute`].
    pub fn execute_command(&mut self, command: Command) -> Result<()> {
        log_op_start!(
            "execute_command",
            transaction_id = %self.correlation.transaction_id,
            command_kind = command.kind()
        );
        let start = Instant::now();

        let expansion_len = self.run(command).map_err(|e| {
            log_op_error!(
                "execute_command",
                self.error_context(&e),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "execute_command",
            duration_ms = start.elapsed().as_millis() as u64,
            transaction_id = %self.correlation.transaction_id,
            expansion_len = expansion_len
        );
        Ok(())
    }

    /// Collect every error the change would hit, without executing it
    ///
    /// # Errors
    ///
    /// Returns all construction and validation failures.
    pub fn check(&self, change: &RelationChange) -> std::result::Result<(), Vec<RelationError>> {
        let command = build_command(&self.graph, change).map_err(|e| vec![e])?;
        command.expand(&self.graph).map_err(|e| vec![e])?.validate(&self.graph)
    }

    /// Unlink `entity` from all related entities and mark it deleted
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `EntityDeleted` if the entity is not live,
    /// or the first error raised while executing. The graph is unchanged on
    /// error.
    pub fn delete_entity(&mut self, entity: &EntityId) -> Result<()> {
        log_op_start!(
            "delete_entity",
            transaction_id = %self.correlation.transaction_id,
            entity_id = %entity
        );
        let start = Instant::now();

        let expansion_len = self.delete_entity_impl(entity).map_err(|e| {
            log_op_error!(
                "delete_entity",
                self.error_context(&e),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "delete_entity",
            duration_ms = start.elapsed().as_millis() as u64,
            transaction_id = %self.correlation.transaction_id,
            expansion_len = expansion_len
        );
        Ok(())
    }

    /// Accept every pending change as the new original state
    pub fn commit(&mut self) {
        log_op_start!("commit", transaction_id = %self.correlation.transaction_id);
        let start = Instant::now();

        let changed = self.graph.changed_end_points().len();
        self.graph.commit();

        log_op_end!(
            "commit",
            duration_ms = start.elapsed().as_millis() as u64,
            transaction_id = %self.correlation.transaction_id,
            changed_end_points = changed
        );
    }

    /// Discard every pending change
    pub fn rollback(&mut self) {
        log_op_start!("rollback", transaction_id = %self.correlation.transaction_id);
        let start = Instant::now();

        let changed = self.graph.changed_end_points().len();
        self.graph.rollback();

        log_op_end!(
            "rollback",
            duration_ms = start.elapsed().as_millis() as u64,
            transaction_id = %self.correlation.transaction_id,
            changed_end_points = changed
        );
    }

    fn run(&mut self, command: Command) -> Result<usize> {
        let command = self.decorate_virtual(command)?;
        let expanded = self.decorate_virtual_elements(command.expand(&self.graph)?)?;
        self.execute_atomically(&expanded, |_| Ok(()))?;
        Ok(expanded.len())
    }

    fn delete_entity_impl(&mut self, entity: &EntityId) -> Result<usize> {
        let expanded = self.decorate_virtual_elements(build_delete_command(&self.graph, entity)?)?;
        self.execute_atomically(&expanded, |graph| graph.mark_deleted(entity))?;
        Ok(expanded.len())
    }

    /// Commands on a virtual end point report its state after each perform
    fn decorate_virtual(&self, command: Command) -> Result<Command> {
        let Some(end_point) = command.end_point().cloned() else {
            return Ok(command);
        };
        if self.graph.end_point_definition(&end_point)?.is_virtual {
            Ok(command.raising_state_updates(end_point, has_changed_projection))
        } else {
            Ok(command)
        }
    }

    fn error_context(&self, err: &RelationError) -> ExError {
        let ex_err =
            ExError::from(err.clone()).with_transaction_id(self.correlation.transaction_id.clone());
        match &self.correlation.trace_id {
            Some(trace_id) => ex_err.with_trace_id(trace_id.clone()),
            None => ex_err,
        }
    }

    /// Expanded commands that modify a virtual end point report it too
    ///
    /// Elements already watching their own end point are left as they are.
    fn decorate_virtual_elements(&self, expanded: ExpandedCommand) -> Result<ExpandedCommand> {
        let mut commands = Vec::with_capacity(expanded.len());
        for command in expanded.iter() {
            let reported = match command.end_point() {
                Some(end_point) if !command.reports_state_of(end_point) => {
                    self.graph.end_point_definition(end_point)?.is_virtual
                }
                _ => false,
            };
            if reported {
                commands.push(self.decorate_virtual(command.clone())?);
            } else {
                commands.push(command.clone());
            }
        }
        Ok(ExpandedCommand::new(commands))
    }

    fn execute_atomically(
        &mut self,
        expanded: &ExpandedCommand,
        finish: impl FnOnce(&mut RelationGraph) -> Result<()>,
    ) -> Result<()> {
        let snapshot = self.graph.clone();
        let result = {
            let mut ctx = ExecutionContext::new(
                &mut self.graph,
                self.hooks.as_mut(),
                self.listener.as_mut(),
                self.state_listener.as_mut(),
            );
            expanded.execute(&mut ctx)
        }
        .and_then(|()| finish(&mut self.graph));

        if let Err(err) = result {
            tracing::debug!(
                transaction_id = %self.correlation.transaction_id,
                error = %err,
                "restoring graph after failed execution"
            );
            self.graph = snapshot;
            return Err(err);
        }
        Ok(())
    }
}
