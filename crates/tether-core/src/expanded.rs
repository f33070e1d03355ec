//! Expanded command sequences
//!
//! An [`ExpandedCommand`] is the flat, ordered result of expanding one or
//! more commands. Each phase runs over every command in order before the
//! next phase starts:
//!
//! ```text
//! notify_begin(all) -> begin(all) -> perform(all) -> end(all) -> notify_end(all)
//! ```
//!
//! Execution is fail-fast. Phases that already completed are not undone here;
//! the owning transaction decides whether to roll back.

use crate::command::Command;
use crate::errors::{RelationError, Result};
use crate::graph::RelationGraph;
use crate::observer::ExecutionContext;

#[derive(Debug, Clone, Default)]
pub struct ExpandedCommand {
    commands: Vec<Command>,
}

impl ExpandedCommand {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Concatenate two expansions, keeping the order within each
    pub fn combine(mut self, other: ExpandedCommand) -> Self {
        self.commands.extend(other.commands);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn notify_begin(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.commands
            .iter()
            .try_for_each(|command| command.notify_begin(ctx))
    }

    pub fn begin(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.commands.iter().try_for_each(|command| command.begin(ctx))
    }

    pub fn perform(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.commands
            .iter()
            .try_for_each(|command| command.perform(ctx))
    }

    pub fn end(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.commands.iter().try_for_each(|command| command.end(ctx))
    }

    pub fn notify_end(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.commands
            .iter()
            .try_for_each(|command| command.notify_end(ctx))
    }

    /// Run all five phases in order
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a hook, listener or mutation.
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        self.notify_begin(ctx)?;
        self.begin(ctx)?;
        self.perform(ctx)?;
        self.end(ctx)?;
        self.notify_end(ctx)
    }

    /// Every construction-time check that fails against `graph`
    pub fn get_all_exceptions(&self, graph: &RelationGraph) -> Vec<RelationError> {
        self.commands
            .iter()
            .filter_map(|command| command.validate(graph).err())
            .collect()
    }

    /// Check every command against `graph` without stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns all failures, in command order.
    pub fn validate(&self, graph: &RelationGraph) -> std::result::Result<(), Vec<RelationError>> {
        let errors = self.get_all_exceptions(graph);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<Command> for ExpandedCommand {
    fn from(command: Command) -> Self {
        Self::new(vec![command])
    }
}

impl FromIterator<Command> for ExpandedCommand {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for ExpandedCommand {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExpandedCommand {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
