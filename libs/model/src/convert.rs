//! Conversion between session nodes and the structured persistence form
//!
//! The structured tree is the serialization-neutral shape used for both
//! persistence and command undo backups:
//!
//! ```json
//! { "type": "Group",
//!   "data": [ { "role": 0, "value": { "kind": "text", "value": "…" } } ],
//!   "tags": [ { "name": "items", "min": 0, "max": null, "children": [] } ] }
//! ```
//!
//! Serialization is deterministic: data entries are emitted in ascending
//! role order, tags in registration order, children in insertion order.
//! The same tree with the same context always produces byte-identical
//! output.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::factory::NodeFactory;
use crate::node::{attach_child, detach_child, NodeRef};
use crate::pool::{NodeKey, NodePool};
use crate::tags::{NodeTags, TagDef};
use crate::value::{Role, Value};

/// Serialized form of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub data: Vec<DataEntry>,
    pub tags: Vec<TagEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub role: Role,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    #[serde(default)]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
    pub children: Vec<StructuredNode>,
}

/// Policy switches recognized by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConverterFlags {
    /// On load, keep the identifier found in the structured form instead
    /// of minting a fresh one. Minting is the default: merging a loaded
    /// subtree into a live registry must not collide with keys already
    /// in use.
    pub reuse_identifier: bool,
    /// On load into an existing node, replace all data and tags rather
    /// than merge.
    pub hard_reset: bool,
    /// Transfer only the identifier and primary-value roles.
    pub project_mode: bool,
}

impl ConverterFlags {
    /// Project persistence: stable identifiers, full replacement, only
    /// the roles a project file owns.
    pub const PROJECT: ConverterFlags = ConverterFlags {
        reuse_identifier: true,
        hard_reset: true,
        project_mode: true,
    };

    /// Exact clone of a subtree, identifiers included.
    pub const CLONE: ConverterFlags = ConverterFlags {
        reuse_identifier: true,
        hard_reset: true,
        project_mode: false,
    };
}

/// Configuration bundle for one conversion run.
pub struct ConverterContext {
    pub factory: Rc<dyn NodeFactory>,
    pub flags: ConverterFlags,
}

impl ConverterContext {
    pub fn new(factory: Rc<dyn NodeFactory>, flags: ConverterFlags) -> Self {
        Self { factory, flags }
    }
}

fn accepts_role(flags: &ConverterFlags, role: Role) -> bool {
    if flags.project_mode {
        role == Role::IDENTIFIER || role == Role::DATA
    } else {
        true
    }
}

/// Serializes `node` and its subtree.
pub fn to_structured(node: &NodeRef, ctx: &ConverterContext) -> StructuredNode {
    let n = node.borrow();
    let data = n
        .data_entries()
        .filter(|(role, _)| accepts_role(&ctx.flags, *role))
        .map(|(role, value)| DataEntry {
            role,
            value: value.clone(),
        })
        .collect();
    let tags = n
        .tags()
        .iter()
        .map(|slot| TagEntry {
            name: slot.def().name.clone(),
            min: slot.def().min,
            max: slot.def().max,
            children: slot
                .children()
                .iter()
                .map(|child| to_structured(child, ctx))
                .collect(),
        })
        .collect();
    StructuredNode {
        node_type: n.node_type().to_string(),
        data,
        tags,
    }
}

/// Builds a fresh node from the structured form. Nothing is registered;
/// attaching the result to a model registers its subtree. On error no
/// partially-built node is returned.
pub fn from_structured(tree: &StructuredNode, ctx: &ConverterContext) -> ModelResult<NodeRef> {
    let node = ctx.factory.create(&tree.node_type)?;
    populate(tree, &node, ctx)?;
    Ok(node)
}

/// Loads the structured form into an existing node.
///
/// With `hard_reset` the node's data and tags are replaced wholesale.
/// Otherwise data roles and tags named in the structured form are
/// overwritten while everything else stays intact; children of a named
/// tag are always rebuilt from the structured form.
pub fn populate(tree: &StructuredNode, node: &NodeRef, ctx: &ConverterContext) -> ModelResult<()> {
    {
        let n = node.borrow();
        if n.node_type() != tree.node_type {
            return Err(ModelError::TypeMismatch {
                expected: n.node_type().to_string(),
                found: tree.node_type.clone(),
            });
        }
    }

    if ctx.flags.hard_reset {
        let mut n = node.borrow_mut();
        n.clear_data();
        let _ = n.replace_tags(NodeTags::new());
    }

    {
        let mut n = node.borrow_mut();
        for entry in &tree.data {
            if accepts_role(&ctx.flags, entry.role) {
                n.set_data(entry.role, entry.value.clone());
            }
        }
    }

    for entry in &tree.tags {
        if !node.borrow().tags().has_tag(&entry.name) {
            node.borrow_mut().register_tag(TagDef {
                name: entry.name.clone(),
                min: entry.min,
                max: entry.max,
            })?;
        } else if !ctx.flags.hard_reset {
            while !node
                .borrow()
                .tags()
                .slot(&entry.name)
                .is_some_and(|slot| slot.is_empty())
            {
                detach_child(node, &entry.name, 0)?;
            }
        }
        for (index, child_tree) in entry.children.iter().enumerate() {
            let child = from_structured(child_tree, ctx)?;
            attach_child(node, &entry.name, index, &child)?;
        }
    }

    if !ctx.flags.reuse_identifier {
        node.borrow_mut()
            .set_data(Role::IDENTIFIER, Value::Text(NodePool::generate_key()));
    }
    Ok(())
}

/// All identifiers carried by the structured form, pre-order.
pub(crate) fn collect_identifiers(tree: &StructuredNode, out: &mut Vec<NodeKey>) {
    for entry in &tree.data {
        if entry.role == Role::IDENTIFIER {
            if let Value::Text(key) = &entry.value {
                out.push(key.clone());
            }
        }
    }
    for tag in &tree.tags {
        for child in &tag.children {
            collect_identifiers(child, out);
        }
    }
}

pub fn to_json_value(node: &NodeRef, ctx: &ConverterContext) -> ModelResult<serde_json::Value> {
    serde_json::to_value(to_structured(node, ctx))
        .map_err(|err| ModelError::SchemaMismatch(err.to_string()))
}

pub fn to_json_string(node: &NodeRef, ctx: &ConverterContext) -> ModelResult<String> {
    serde_json::to_string(&to_structured(node, ctx))
        .map_err(|err| ModelError::SchemaMismatch(err.to_string()))
}

pub fn from_json_value(value: &serde_json::Value, ctx: &ConverterContext) -> ModelResult<NodeRef> {
    let tree: StructuredNode = serde_json::from_value(value.clone())
        .map_err(|err| ModelError::SchemaMismatch(err.to_string()))?;
    from_structured(&tree, ctx)
}

pub fn from_json_str(json: &str, ctx: &ConverterContext) -> ModelResult<NodeRef> {
    let tree: StructuredNode =
        serde_json::from_str(json).map_err(|err| ModelError::SchemaMismatch(err.to_string()))?;
    from_structured(&tree, ctx)
}
