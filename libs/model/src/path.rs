//! Root-relative node addresses
//!
//! A [`Path`] is a sequence of (tag, index) steps from the document root.
//! Commands store paths instead of node handles so their targets stay
//! valid across serialization round-trips and registry changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::NodeRef;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub tag: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path(Vec<PathStep>);

impl Path {
    /// The path of the document root itself.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn push(&mut self, tag: impl Into<String>, index: usize) {
        self.0.push(PathStep {
            tag: tag.into(),
            index,
        });
    }

    /// A new path one step below this one.
    pub fn child(&self, tag: impl Into<String>, index: usize) -> Path {
        let mut path = self.clone();
        path.push(tag, index);
        path
    }

    /// The path of the addressed node's parent; `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Path(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// Walks the steps down from `root`. `None` when any step does not
    /// exist in the current tree.
    pub fn resolve(&self, root: &NodeRef) -> Option<NodeRef> {
        let mut current = root.clone();
        for step in &self.0 {
            let next = {
                let node = current.borrow();
                let slot = node.tags().slot(&step.tag)?;
                slot.children().get(step.index)?.clone()
            };
            current = next;
        }
        Some(current)
    }

    /// Reconstructs the path of `node` relative to `root` by walking the
    /// parent links upward. `None` when `node` is not in `root`'s tree.
    pub fn of(node: &NodeRef, root: &NodeRef) -> Option<Path> {
        let mut steps = Vec::new();
        let mut current = node.clone();
        while !std::rc::Rc::ptr_eq(&current, root) {
            let parent = current.borrow().parent()?;
            let (tag, index) = parent.borrow().tags().position_of(&current)?;
            steps.push(PathStep { tag, index });
            current = parent;
        }
        steps.reverse();
        Some(Path(steps))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for step in &self.0 {
            write!(f, "/{}.{}", step.tag, step.index)?;
        }
        Ok(())
    }
}
