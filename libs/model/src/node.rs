//! The document node
//!
//! A [`SessionNode`] is the unit of the hierarchical document. It owns
//! its children strictly through its tags (`Rc`), while parent and pool
//! links are weak: relation plus lookup, never shared ownership. Parent
//! destruction therefore cascades to children, and a node can always be
//! dropped safely after its registry is gone.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::error::{ModelError, ModelResult};
use crate::pool::{NodeKey, NodePool};
use crate::tags::{NodeTags, TagDef};
use crate::value::{Role, Value};

/// Shared handle to a node.
pub type NodeRef = Rc<RefCell<SessionNode>>;
/// Non-owning handle to a node.
pub type WeakNodeRef = Weak<RefCell<SessionNode>>;

/// Bit flags stored under [`Role::APPEARANCE`].
///
/// A node without an appearance slot is enabled and editable.
pub mod appearance {
    pub const ENABLED: i64 = 0b01;
    pub const EDITABLE: i64 = 0b10;
    pub const DEFAULT: i64 = ENABLED | EDITABLE;
}

pub struct SessionNode {
    node_type: String,
    data: BTreeMap<Role, Value>,
    tags: NodeTags,
    parent: WeakNodeRef,
    pool: Weak<RefCell<NodePool>>,
}

impl SessionNode {
    /// Creates a detached, unregistered node of the given type.
    pub fn new(node_type: impl Into<String>) -> NodeRef {
        Rc::new(RefCell::new(SessionNode {
            node_type: node_type.into(),
            data: BTreeMap::new(),
            tags: NodeTags::new(),
            parent: Weak::new(),
            pool: Weak::new(),
        }))
    }

    /// The type tag, fixed at creation.
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// The registry key, if this node has ever been registered.
    pub fn key(&self) -> Option<NodeKey> {
        match self.data.get(&Role::IDENTIFIER) {
            Some(Value::Text(key)) => Some(key.clone()),
            _ => None,
        }
    }

    pub fn data(&self, role: Role) -> Option<&Value> {
        self.data.get(&role)
    }

    pub fn has_data(&self, role: Role) -> bool {
        self.data.contains_key(&role)
    }

    /// Stores `value` under `role`, returning the previous value. Absence
    /// is distinct from any stored value.
    pub fn set_data(&mut self, role: Role, value: Value) -> Option<Value> {
        self.data.insert(role, value)
    }

    /// Removes the slot entirely.
    pub fn take_data(&mut self, role: Role) -> Option<Value> {
        self.data.remove(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.data.keys().copied()
    }

    pub(crate) fn data_entries(&self) -> impl Iterator<Item = (Role, &Value)> {
        self.data.iter().map(|(r, v)| (*r, v))
    }

    pub(crate) fn clear_data(&mut self) {
        self.data.clear();
    }

    /// The display label: the `DISPLAY` slot when present, else the type.
    pub fn display_name(&self) -> String {
        match self.data.get(&Role::DISPLAY) {
            Some(value) => value.display_text(),
            None => self.node_type.clone(),
        }
    }

    fn appearance(&self) -> i64 {
        match self.data.get(&Role::APPEARANCE) {
            Some(Value::Int(flags)) => *flags,
            _ => appearance::DEFAULT,
        }
    }

    fn set_appearance_flag(&mut self, flag: i64, on: bool) {
        let flags = if on {
            self.appearance() | flag
        } else {
            self.appearance() & !flag
        };
        self.data.insert(Role::APPEARANCE, Value::Int(flags));
    }

    pub fn is_enabled(&self) -> bool {
        self.appearance() & appearance::ENABLED != 0
    }

    pub fn is_editable(&self) -> bool {
        self.appearance() & appearance::EDITABLE != 0
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.set_appearance_flag(appearance::ENABLED, on);
    }

    pub fn set_editable(&mut self, on: bool) {
        self.set_appearance_flag(appearance::EDITABLE, on);
    }

    /// Declares a new child group on this node.
    pub fn register_tag(&mut self, def: TagDef) -> ModelResult<()> {
        self.tags.register(def)
    }

    pub fn tags(&self) -> &NodeTags {
        &self.tags
    }

    pub(crate) fn tags_mut(&mut self) -> &mut NodeTags {
        &mut self.tags
    }

    pub(crate) fn replace_tags(&mut self, tags: NodeTags) -> NodeTags {
        std::mem::replace(&mut self.tags, tags)
    }

    /// The owning parent, if attached and still alive.
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    pub(crate) fn set_parent(&mut self, parent: WeakNodeRef) {
        self.parent = parent;
    }

    pub(crate) fn attach_pool(&mut self, pool: Weak<RefCell<NodePool>>) {
        self.pool = pool;
    }
}

impl Drop for SessionNode {
    fn drop(&mut self) {
        // Registration degrades gracefully: a dead pool is skipped.
        if let (Some(pool), Some(key)) = (self.pool.upgrade(), self.key()) {
            pool.borrow_mut().forget(&key);
        }
    }
}

/// Attaches `child` under `parent` at `tag`/`index`.
///
/// Validates that the tag exists, has room and that `index` is at most
/// the current child count. The child's previous parent link, if any, is
/// overwritten; callers detach first when moving.
pub fn attach_child(parent: &NodeRef, tag: &str, index: usize, child: &NodeRef) -> ModelResult<()> {
    if Rc::ptr_eq(parent, child) {
        return Err(ModelError::InvalidMove(
            "a node cannot become its own child".into(),
        ));
    }
    let mut p = parent.borrow_mut();
    let slot = p
        .tags_mut()
        .slot_mut(tag)
        .ok_or_else(|| ModelError::InvalidParent(format!("no tag {tag:?}")))?;
    if slot.is_full() {
        let max = slot.def().max.unwrap_or(0);
        return Err(ModelError::TagCapacityExceeded {
            tag: tag.to_string(),
            max,
        });
    }
    if index > slot.len() {
        return Err(ModelError::InvalidParent(format!(
            "index {index} out of range for tag {tag:?} of length {}",
            slot.len()
        )));
    }
    child.borrow_mut().set_parent(Rc::downgrade(parent));
    slot.insert(index, child.clone());
    Ok(())
}

/// Detaches the child at `tag`/`index` from `parent`, severing its
/// back-reference, and returns it.
pub fn detach_child(parent: &NodeRef, tag: &str, index: usize) -> ModelResult<NodeRef> {
    let mut p = parent.borrow_mut();
    let slot = p
        .tags_mut()
        .slot_mut(tag)
        .ok_or_else(|| ModelError::InvalidPath(format!("no tag {tag:?}")))?;
    if index >= slot.len() {
        return Err(ModelError::InvalidPath(format!(
            "index {index} out of range for tag {tag:?} of length {}",
            slot.len()
        )));
    }
    let child = slot.remove(index);
    child.borrow_mut().set_parent(Weak::new());
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> NodeRef {
        let node = SessionNode::new("Group");
        node.borrow_mut()
            .register_tag(TagDef::new("items"))
            .expect("tag");
        node
    }

    #[test]
    fn fresh_node_has_no_key_and_default_appearance() {
        let node = SessionNode::new("Group");
        let n = node.borrow();
        assert_eq!(n.node_type(), "Group");
        assert_eq!(n.key(), None);
        assert!(n.is_enabled());
        assert!(n.is_editable());
    }

    #[test]
    fn data_slots_distinguish_absent_from_present() {
        let node = SessionNode::new("Group");
        let mut n = node.borrow_mut();
        assert!(!n.has_data(Role::DATA));
        assert_eq!(n.set_data(Role::DATA, Value::Int(1)), None);
        assert_eq!(n.set_data(Role::DATA, Value::Int(2)), Some(Value::Int(1)));
        assert_eq!(n.take_data(Role::DATA), Some(Value::Int(2)));
        assert!(!n.has_data(Role::DATA));
    }

    #[test]
    fn display_name_falls_back_to_type() {
        let node = SessionNode::new("Group");
        assert_eq!(node.borrow().display_name(), "Group");
        node.borrow_mut()
            .set_data(Role::DISPLAY, Value::Text("My group".into()));
        assert_eq!(node.borrow().display_name(), "My group");
    }

    #[test]
    fn appearance_flags_toggle() {
        let node = SessionNode::new("Group");
        node.borrow_mut().set_editable(false);
        assert!(!node.borrow().is_editable());
        assert!(node.borrow().is_enabled());
        node.borrow_mut().set_enabled(false);
        assert!(!node.borrow().is_enabled());
        node.borrow_mut().set_editable(true);
        assert!(node.borrow().is_editable());
    }

    #[test]
    fn attach_and_detach_keep_parent_links() {
        let parent = group();
        let child = SessionNode::new("Item");
        attach_child(&parent, "items", 0, &child).expect("attach");
        assert!(child
            .borrow()
            .parent()
            .is_some_and(|p| Rc::ptr_eq(&p, &parent)));
        assert_eq!(
            parent.borrow().tags().position_of(&child),
            Some(("items".into(), 0))
        );

        let detached = detach_child(&parent, "items", 0).expect("detach");
        assert!(Rc::ptr_eq(&detached, &child));
        assert!(child.borrow().parent().is_none());
        assert!(parent.borrow().tags().slot("items").unwrap().is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let parent = SessionNode::new("Group");
        parent
            .borrow_mut()
            .register_tag(TagDef::bounded("only", 0, 1))
            .expect("tag");
        let a = SessionNode::new("Item");
        let b = SessionNode::new("Item");
        attach_child(&parent, "only", 0, &a).expect("attach");
        assert_eq!(
            attach_child(&parent, "only", 1, &b),
            Err(ModelError::TagCapacityExceeded {
                tag: "only".into(),
                max: 1
            })
        );
    }

    #[test]
    fn attach_rejects_unknown_tag_and_bad_index() {
        let parent = group();
        let child = SessionNode::new("Item");
        assert!(matches!(
            attach_child(&parent, "nope", 0, &child),
            Err(ModelError::InvalidParent(_))
        ));
        assert!(matches!(
            attach_child(&parent, "items", 3, &child),
            Err(ModelError::InvalidParent(_))
        ));
    }

    #[test]
    fn dropping_parent_cascades() {
        let pool = NodePool::new_shared();
        let parent = group();
        let child = SessionNode::new("Item");
        attach_child(&parent, "items", 0, &child).expect("attach");
        NodePool::register(&pool, &parent, None).expect("register");
        NodePool::register(&pool, &child, None).expect("register");
        assert_eq!(pool.borrow().size(), 2);

        drop(child); // parent still owns the child
        assert_eq!(pool.borrow().size(), 2);

        drop(parent);
        assert_eq!(pool.borrow().size(), 0);
    }
}
