//! Named, ordered, capacity-bounded groups of children
//!
//! Every node keeps its children in tags. Tag order is registration
//! order; child order within a tag is insertion order unless a command
//! explicitly reorders.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::node::NodeRef;

/// Declared shape of a tag: its name and child-count bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDef {
    pub name: String,
    pub min: usize,
    pub max: Option<usize>,
}

impl TagDef {
    /// An unbounded tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: 0,
            max: None,
        }
    }

    pub fn bounded(name: impl Into<String>, min: usize, max: usize) -> Self {
        Self {
            name: name.into(),
            min,
            max: Some(max),
        }
    }

    /// A single-child property slot.
    pub fn property(name: impl Into<String>) -> Self {
        Self::bounded(name, 1, 1)
    }
}

/// One tag with its live children.
pub struct TagSlot {
    def: TagDef,
    children: Vec<NodeRef>,
}

impl TagSlot {
    fn new(def: TagDef) -> Self {
        Self {
            def,
            children: Vec::new(),
        }
    }

    pub fn def(&self) -> &TagDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.def.max.is_some_and(|max| self.children.len() >= max)
    }

    pub(crate) fn insert(&mut self, index: usize, child: NodeRef) {
        self.children.insert(index, child);
    }

    pub(crate) fn remove(&mut self, index: usize) -> NodeRef {
        self.children.remove(index)
    }
}

/// The ordered collection of a node's tags.
#[derive(Default)]
pub struct NodeTags {
    slots: Vec<TagSlot>,
}

impl NodeTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new tag; tag names are unique per node.
    pub fn register(&mut self, def: TagDef) -> ModelResult<()> {
        if self.slot(&def.name).is_some() {
            return Err(ModelError::DuplicateTag(def.name));
        }
        self.slots.push(TagSlot::new(def));
        Ok(())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn slot(&self, name: &str) -> Option<&TagSlot> {
        self.slots.iter().find(|s| s.def.name == name)
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut TagSlot> {
        self.slots.iter_mut().find(|s| s.def.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All children across tags, in tag order then insertion order.
    pub fn all_children(&self) -> Vec<NodeRef> {
        self.slots
            .iter()
            .flat_map(|s| s.children.iter().cloned())
            .collect()
    }

    /// Locates `child` among the tags, returning its tag name and index.
    pub fn position_of(&self, child: &NodeRef) -> Option<(String, usize)> {
        for slot in &self.slots {
            if let Some(index) = slot
                .children
                .iter()
                .position(|c| std::rc::Rc::ptr_eq(c, child))
            {
                return Some((slot.def.name.clone(), index));
            }
        }
        None
    }
}
