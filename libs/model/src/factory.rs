//! Node construction from type tags

use std::collections::HashMap;

use crate::error::{ModelError, ModelResult};
use crate::node::{NodeRef, SessionNode};
use crate::tags::TagDef;

/// Builds empty nodes from their type tags. Implementations must be total
/// over the set of types the application registers; an unknown tag is a
/// configuration error reported as [`ModelError::UnknownType`].
pub trait NodeFactory {
    fn create(&self, node_type: &str) -> ModelResult<NodeRef>;

    fn can_create(&self, node_type: &str) -> bool;
}

type Constructor = Box<dyn Fn() -> NodeRef>;

/// The stock factory: a name → constructor map.
#[derive(Default)]
pub struct TypeCatalog {
    constructors: HashMap<String, Constructor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an arbitrary constructor for `node_type`. A later
    /// registration under the same name replaces the earlier one.
    pub fn register_type(
        &mut self,
        node_type: impl Into<String>,
        constructor: impl Fn() -> NodeRef + 'static,
    ) {
        self.constructors
            .insert(node_type.into(), Box::new(constructor));
    }

    /// Registers a plain node type with a fixed set of tags.
    pub fn register_simple(&mut self, node_type: impl Into<String>, tags: Vec<TagDef>) {
        let node_type = node_type.into();
        let name = node_type.clone();
        self.register_type(node_type, move || {
            let node = SessionNode::new(name.clone());
            for def in &tags {
                // a fresh node cannot have duplicate tags
                let _ = node.borrow_mut().register_tag(def.clone());
            }
            node
        });
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl NodeFactory for TypeCatalog {
    fn create(&self, node_type: &str) -> ModelResult<NodeRef> {
        match self.constructors.get(node_type) {
            Some(constructor) => Ok(constructor()),
            None => Err(ModelError::UnknownType(node_type.to_string())),
        }
    }

    fn can_create(&self, node_type: &str) -> bool {
        self.constructors.contains_key(node_type)
    }
}
