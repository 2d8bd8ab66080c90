//! Reversible document mutations
//!
//! Each command captures exactly what it needs to apply and reverse one
//! mutation: targets are paths, never node handles, and destructive
//! commands keep a structured-form backup of what they removed. All
//! validation happens before the first touch, so a failed command leaves
//! the document unchanged.

use tracing::debug;

use crate::convert::{from_structured, to_structured, StructuredNode};
use crate::error::{ModelError, ModelResult};
use crate::event::ModelEvent;
use crate::model::ModelCore;
use crate::node::{attach_child, detach_child};
use crate::path::Path;
use crate::utils::iterate;
use crate::value::{Role, Value};

/// One reversible unit of document mutation.
pub trait Command {
    fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()>;
    fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()>;
    fn label(&self) -> &str;
}

/// Sets, replaces or clears one data slot.
///
/// Stores the incoming value and swaps it with the stored one on every
/// redo/undo, so a single field serves both directions.
pub struct SetValueCommand {
    path: Path,
    role: Role,
    value: Option<Value>,
}

impl SetValueCommand {
    pub fn new(path: Path, role: Role, value: Option<Value>) -> Self {
        Self { path, role, value }
    }

    fn swap(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let node = core.resolve(&self.path)?;
        let previous = {
            let mut n = node.borrow_mut();
            match self.value.take() {
                Some(value) => n.set_data(self.role, value),
                None => n.take_data(self.role),
            }
        };
        self.value = previous;
        debug!(path = %self.path, role = self.role.0, "set value");
        core.notify(ModelEvent::DataChanged {
            node,
            path: self.path.clone(),
            role: self.role,
        });
        Ok(())
    }
}

impl Command for SetValueCommand {
    fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        self.swap(core)
    }

    fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        self.swap(core)
    }

    fn label(&self) -> &str {
        "set value"
    }
}

/// Inserts a fresh node built by the factory.
///
/// The first redo creates the node; undo keeps a structured backup so
/// later redos restore it with the same key and contents.
pub struct InsertNodeCommand {
    node_type: String,
    parent_path: Path,
    tag: String,
    index: usize,
    backup: Option<StructuredNode>,
}

impl InsertNodeCommand {
    pub fn new(node_type: impl Into<String>, parent_path: Path, tag: impl Into<String>, index: usize) -> Self {
        Self {
            node_type: node_type.into(),
            parent_path,
            tag: tag.into(),
            index,
            backup: None,
        }
    }
}

impl Command for InsertNodeCommand {
    fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let parent = core.resolve_parent(&self.parent_path)?;
        {
            let p = parent.borrow();
            let slot = p
                .tags()
                .slot(&self.tag)
                .ok_or_else(|| ModelError::InvalidParent(format!("no tag {:?}", self.tag)))?;
            if slot.is_full() {
                return Err(ModelError::TagCapacityExceeded {
                    tag: self.tag.clone(),
                    max: slot.def().max.unwrap_or(0),
                });
            }
            if self.index > slot.len() {
                return Err(ModelError::InvalidParent(format!(
                    "index {} out of range for tag {:?} of length {}",
                    self.index,
                    self.tag,
                    slot.len()
                )));
            }
        }
        let node = match &self.backup {
            Some(tree) => from_structured(tree, &core.backup_context())?,
            None => core.factory().create(&self.node_type)?,
        };
        core.register_subtree(&node)?;
        if let Err(err) = attach_child(&parent, &self.tag, self.index, &node) {
            core.deregister_subtree(&node);
            return Err(err);
        }
        debug!(node_type = %self.node_type, parent = %self.parent_path,
               tag = %self.tag, index = self.index, "insert node");
        core.notify(ModelEvent::Inserted {
            parent,
            parent_path: self.parent_path.clone(),
            tag: self.tag.clone(),
            index: self.index,
        });
        Ok(())
    }

    fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let path = self.parent_path.child(self.tag.clone(), self.index);
        let node = core.resolve(&path)?;
        self.backup = Some(to_structured(&node, &core.backup_context()));
        core.notify(ModelEvent::AboutToRemove {
            node: node.clone(),
            path: path.clone(),
        });
        core.deregister_subtree(&node);
        let parent = core.resolve(&self.parent_path)?;
        detach_child(&parent, &self.tag, self.index)?;
        core.notify(ModelEvent::Removed {
            parent,
            parent_path: self.parent_path.clone(),
            tag: self.tag.clone(),
            index: self.index,
        });
        Ok(())
    }

    fn label(&self) -> &str {
        "insert node"
    }
}

/// Removes a subtree, keeping its structured form for undo.
pub struct RemoveNodeCommand {
    path: Path,
    backup: Option<StructuredNode>,
}

impl RemoveNodeCommand {
    pub fn new(path: Path) -> Self {
        Self { path, backup: None }
    }
}

impl Command for RemoveNodeCommand {
    fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let (parent_path, step) = match (self.path.parent(), self.path.last().cloned()) {
            (Some(parent_path), Some(step)) => (parent_path, step),
            _ => return Err(ModelError::InvalidPath("cannot remove the root".into())),
        };
        let node = core.resolve(&self.path)?;
        let parent = core.resolve(&parent_path)?;

        self.backup = Some(to_structured(&node, &core.backup_context()));
        debug!(path = %self.path, "remove node");
        core.notify(ModelEvent::AboutToRemove {
            node: node.clone(),
            path: self.path.clone(),
        });
        core.deregister_subtree(&node);
        detach_child(&parent, &step.tag, step.index)?;
        core.notify(ModelEvent::Removed {
            parent,
            parent_path,
            tag: step.tag,
            index: step.index,
        });
        Ok(())
    }

    fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let parent_path = self
            .path
            .parent()
            .ok_or(ModelError::HistoryCorrupted)?;
        let step = self.path.last().cloned().ok_or(ModelError::HistoryCorrupted)?;
        let tree = self.backup.as_ref().ok_or(ModelError::HistoryCorrupted)?;
        let parent = core.resolve(&parent_path)?;
        let node = from_structured(tree, &core.backup_context())?;
        core.register_subtree(&node)?;
        attach_child(&parent, &step.tag, step.index, &node)?;
        core.notify(ModelEvent::Inserted {
            parent,
            parent_path,
            tag: step.tag,
            index: step.index,
        });
        Ok(())
    }

    fn label(&self) -> &str {
        "remove node"
    }
}

/// Coordinates of a moved node after the move, kept for undo.
struct MoveBack {
    node_path: Path,
    source_parent: Path,
    source_tag: String,
    source_index: usize,
}

/// Atomic detach + attach. The destination index addresses the
/// destination tag as it looks after the source is detached.
pub struct MoveNodeCommand {
    source: Path,
    dest_parent: Path,
    dest_tag: String,
    dest_index: usize,
    moved: Option<MoveBack>,
}

impl MoveNodeCommand {
    pub fn new(source: Path, dest_parent: Path, dest_tag: impl Into<String>, dest_index: usize) -> Self {
        Self {
            source,
            dest_parent,
            dest_tag: dest_tag.into(),
            dest_index,
            moved: None,
        }
    }
}

impl Command for MoveNodeCommand {
    fn redo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let (source_parent_path, step) = match (self.source.parent(), self.source.last().cloned())
        {
            (Some(parent_path), Some(step)) => (parent_path, step),
            _ => return Err(ModelError::InvalidMove("cannot move the root".into())),
        };
        let node = core.resolve(&self.source)?;
        let source_parent = core.resolve(&source_parent_path)?;
        let dest_parent = core.resolve(&self.dest_parent)?;

        let mut cycle = false;
        iterate(&node, &mut |n| {
            if std::rc::Rc::ptr_eq(n, &dest_parent) {
                cycle = true;
            }
        });
        if cycle {
            return Err(ModelError::InvalidMove(
                "destination is inside the moved subtree".into(),
            ));
        }

        let same_slot =
            std::rc::Rc::ptr_eq(&source_parent, &dest_parent) && step.tag == self.dest_tag;
        {
            let dp = dest_parent.borrow();
            let slot = dp
                .tags()
                .slot(&self.dest_tag)
                .ok_or_else(|| ModelError::InvalidMove(format!("no tag {:?}", self.dest_tag)))?;
            if !same_slot && slot.is_full() {
                return Err(ModelError::InvalidMove(format!(
                    "destination tag {:?} is full",
                    self.dest_tag
                )));
            }
            let len_after_detach = if same_slot { slot.len() - 1 } else { slot.len() };
            if self.dest_index > len_after_detach {
                return Err(ModelError::InvalidMove(format!(
                    "destination index {} out of range",
                    self.dest_index
                )));
            }
        }

        debug!(source = %self.source, dest = %self.dest_parent,
               tag = %self.dest_tag, index = self.dest_index, "move node");
        core.notify(ModelEvent::AboutToRemove {
            node: node.clone(),
            path: self.source.clone(),
        });
        detach_child(&source_parent, &step.tag, step.index)?;
        core.notify(ModelEvent::Removed {
            parent: source_parent.clone(),
            parent_path: source_parent_path,
            tag: step.tag.clone(),
            index: step.index,
        });
        attach_child(&dest_parent, &self.dest_tag, self.dest_index, &node)?;
        let dest_parent_path = core.path_of(&dest_parent)?;
        core.notify(ModelEvent::Inserted {
            parent: dest_parent,
            parent_path: dest_parent_path.clone(),
            tag: self.dest_tag.clone(),
            index: self.dest_index,
        });

        self.moved = Some(MoveBack {
            node_path: dest_parent_path.child(self.dest_tag.clone(), self.dest_index),
            source_parent: core.path_of(&source_parent)?,
            source_tag: step.tag,
            source_index: step.index,
        });
        Ok(())
    }

    fn undo(&mut self, core: &mut ModelCore) -> ModelResult<()> {
        let back = self.moved.as_ref().ok_or(ModelError::HistoryCorrupted)?;
        let dest_parent_path = back
            .node_path
            .parent()
            .ok_or(ModelError::HistoryCorrupted)?;
        let step = back
            .node_path
            .last()
            .cloned()
            .ok_or(ModelError::HistoryCorrupted)?;
        let node = core.resolve(&back.node_path)?;
        let dest_parent = core.resolve(&dest_parent_path)?;
        let source_parent = core.resolve(&back.source_parent)?;

        core.notify(ModelEvent::AboutToRemove {
            node: node.clone(),
            path: back.node_path.clone(),
        });
        detach_child(&dest_parent, &step.tag, step.index)?;
        core.notify(ModelEvent::Removed {
            parent: dest_parent,
            parent_path: dest_parent_path,
            tag: step.tag,
            index: step.index,
        });
        attach_child(&source_parent, &back.source_tag, back.source_index, &node)?;
        let source_parent_path = core.path_of(&source_parent)?;
        core.notify(ModelEvent::Inserted {
            parent: source_parent,
            parent_path: source_parent_path,
            tag: back.source_tag.clone(),
            index: back.source_index,
        });
        Ok(())
    }

    fn label(&self) -> &str {
        "move node"
    }
}
