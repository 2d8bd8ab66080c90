//! Undo/redo stacks over commands
//!
//! The canonical undo-stack discipline: executing a new command clears
//! the forward (redo) stack. A command whose redo or undo fails mid-flight
//! leaves the history unusable; callers must `reset` it, no incremental
//! recovery is attempted.

use tracing::debug;

use crate::commands::Command;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelCore;

#[derive(Default)]
pub struct CommandHistory {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    corrupted: bool,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_usable(&self) -> ModelResult<()> {
        if self.corrupted {
            return Err(ModelError::HistoryCorrupted);
        }
        Ok(())
    }

    /// Applies `command` and records it. A command that fails validation
    /// is not recorded and the document stays untouched; the history
    /// remains usable.
    pub fn execute(&mut self, core: &mut ModelCore, mut command: Box<dyn Command>) -> ModelResult<()> {
        self.ensure_usable()?;
        command.redo(core)?;
        debug!(command = command.label(), "executed");
        self.redo_stack.clear();
        self.undo_stack.push(command);
        Ok(())
    }

    /// Reverses the most recent command. A no-op on an empty stack.
    pub fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        self.ensure_usable()?;
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(());
        };
        match command.undo(core) {
            Ok(()) => {
                debug!(command = command.label(), "undone");
                self.redo_stack.push(command);
                Ok(())
            }
            Err(_) => {
                self.corrupted = true;
                Err(ModelError::HistoryCorrupted)
            }
        }
    }

    /// Re-applies the most recently undone command. A no-op on an empty
    /// stack.
    pub fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        self.ensure_usable()?;
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(());
        };
        match command.redo(core) {
            Ok(()) => {
                debug!(command = command.label(), "redone");
                self.undo_stack.push(command);
                Ok(())
            }
            Err(_) => {
                self.corrupted = true;
                Err(ModelError::HistoryCorrupted)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.corrupted && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.corrupted && !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// Drops all recorded commands and clears the corrupted state.
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.corrupted = false;
    }
}
