//! Registry of addressable nodes
//!
//! A [`NodePool`] maps opaque unique keys to live nodes. It holds only
//! weak references, so it never keeps a node alive; registered nodes keep
//! a weak handle back to the pool and deregister themselves on drop. One
//! pool usually belongs to one model, but a pool may be shared across
//! several models through its `Rc` handle, in which case key uniqueness
//! spans all of them.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::node::{NodeRef, SessionNode};
use crate::value::{Role, Value};

/// Opaque unique key identifying a registered node.
pub type NodeKey = String;

/// Shared handle to a pool.
pub type PoolRef = Rc<RefCell<NodePool>>;

#[derive(Default)]
pub struct NodePool {
    items: HashMap<NodeKey, Weak<RefCell<SessionNode>>>,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> PoolRef {
        Rc::new(RefCell::new(NodePool::new()))
    }

    /// Mints a fresh key. Keys are never reused after deregistration.
    pub fn generate_key() -> NodeKey {
        Uuid::new_v4().to_string()
    }

    /// Registers `node`, minting a fresh key when `key` is `None`.
    ///
    /// The key is stored in the node's `IDENTIFIER` slot and the node
    /// remembers the pool so it can deregister itself on drop. Fails with
    /// [`ModelError::DuplicateKey`] when the supplied key is already live
    /// or the node is already registered.
    pub fn register(pool: &PoolRef, node: &NodeRef, key: Option<NodeKey>) -> ModelResult<NodeKey> {
        if let Some(existing) = node.borrow().key() {
            let already = pool
                .borrow()
                .resolve(&existing)
                .is_some_and(|n| Rc::ptr_eq(&n, node));
            if already {
                return Err(ModelError::DuplicateKey(existing));
            }
        }
        let key = key.unwrap_or_else(Self::generate_key);
        match pool.borrow_mut().items.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().strong_count() > 0 {
                    return Err(ModelError::DuplicateKey(key));
                }
                entry.insert(Rc::downgrade(node));
            }
            Entry::Vacant(entry) => {
                entry.insert(Rc::downgrade(node));
            }
        }
        let mut n = node.borrow_mut();
        n.set_data(Role::IDENTIFIER, Value::Text(key.clone()));
        n.attach_pool(Rc::downgrade(pool));
        Ok(key)
    }

    /// Removes the registration of `node`. Fails with
    /// [`ModelError::NotRegistered`] when the node was never registered
    /// here or was already removed.
    pub fn deregister(pool: &PoolRef, node: &NodeRef) -> ModelResult<()> {
        let key = node.borrow().key().ok_or(ModelError::NotRegistered)?;
        let mut p = pool.borrow_mut();
        let registered = p
            .items
            .get(&key)
            .and_then(Weak::upgrade)
            .is_some_and(|n| Rc::ptr_eq(&n, node));
        if !registered {
            return Err(ModelError::NotRegistered);
        }
        p.items.remove(&key);
        drop(p);
        node.borrow_mut().attach_pool(Weak::new());
        Ok(())
    }

    /// Looks up a key. Absence is an expected outcome, never a panic; a
    /// stale registration (node already dropped) counts as absent.
    pub fn resolve(&self, key: &str) -> Option<NodeRef> {
        self.items.get(key).and_then(Weak::upgrade)
    }

    /// Reverse lookup: the key under which `node` is registered here.
    pub fn key_of(&self, node: &NodeRef) -> Option<NodeKey> {
        let key = node.borrow().key()?;
        self.resolve(&key)
            .filter(|n| Rc::ptr_eq(n, node))
            .map(|_| key)
    }

    /// Number of currently registered live nodes.
    pub fn size(&self) -> usize {
        self.items
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drop-path removal: no error when the entry is already gone.
    pub(crate) fn forget(&mut self, key: &str) {
        self.items.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SessionNode;

    #[test]
    fn initial_state() {
        let pool = NodePool::new_shared();
        assert_eq!(pool.borrow().size(), 0);
    }

    #[test]
    fn register_node() {
        let pool = NodePool::new_shared();
        let node = SessionNode::new("Thing");

        let key = NodePool::register(&pool, &node, None).expect("register");
        assert_eq!(pool.borrow().size(), 1);
        assert!(!key.is_empty());
        assert_eq!(pool.borrow().key_of(&node), Some(key.clone()));
        assert!(pool
            .borrow()
            .resolve(&key)
            .is_some_and(|n| Rc::ptr_eq(&n, &node)));

        // an unregistered node resolves to nothing
        let other = SessionNode::new("Thing");
        assert_eq!(pool.borrow().key_of(&other), None);
        assert!(pool.borrow().resolve("ABC").is_none());

        let key2 = NodePool::register(&pool, &other, None).expect("register");
        assert_eq!(pool.borrow().size(), 2);
        assert_ne!(key, key2);

        // registering the same node twice is a contract violation
        assert_eq!(
            NodePool::register(&pool, &other, None),
            Err(ModelError::DuplicateKey(key2))
        );
    }

    #[test]
    fn deregister_node() {
        let pool = NodePool::new_shared();
        let a = SessionNode::new("Thing");
        let b = SessionNode::new("Thing");
        let key_a = NodePool::register(&pool, &a, None).expect("register");
        let key_b = NodePool::register(&pool, &b, None).expect("register");
        assert_eq!(pool.borrow().size(), 2);

        NodePool::deregister(&pool, &a).expect("deregister");
        assert_eq!(pool.borrow().size(), 1);
        assert!(pool.borrow().resolve(&key_a).is_none());
        assert!(pool.borrow().resolve(&key_b).is_some());

        // deregistering twice fails
        assert_eq!(
            NodePool::deregister(&pool, &a),
            Err(ModelError::NotRegistered)
        );

        NodePool::deregister(&pool, &b).expect("deregister");
        assert_eq!(pool.borrow().size(), 0);
    }

    #[test]
    fn dropping_a_node_deregisters_it() {
        let pool = NodePool::new_shared();
        let node = SessionNode::new("Thing");
        let key = NodePool::register(&pool, &node, None).expect("register");
        assert_eq!(pool.borrow().size(), 1);

        drop(node);
        assert_eq!(pool.borrow().size(), 0);
        assert!(pool.borrow().resolve(&key).is_none());
    }

    #[test]
    fn pool_may_die_before_its_nodes() {
        let node = SessionNode::new("Thing");
        {
            let pool = NodePool::new_shared();
            NodePool::register(&pool, &node, None).expect("register");
        }
        // the registry is gone; dropping the node must not fault
        drop(node);
    }

    #[test]
    fn custom_key() {
        let pool = NodePool::new_shared();
        let node = SessionNode::new("Thing");
        let key = NodePool::register(&pool, &node, Some("abc-cde-fgh".into())).expect("register");
        assert_eq!(key, "abc-cde-fgh");

        let other = SessionNode::new("Thing");
        assert_eq!(
            NodePool::register(&pool, &other, Some("abc-cde-fgh".into())),
            Err(ModelError::DuplicateKey("abc-cde-fgh".into()))
        );
    }

    #[test]
    fn keys_are_not_recycled() {
        let pool = NodePool::new_shared();
        let a = SessionNode::new("Thing");
        let key_a = NodePool::register(&pool, &a, None).expect("register");
        NodePool::deregister(&pool, &a).expect("deregister");

        let c = SessionNode::new("Thing");
        let key_c = NodePool::register(&pool, &c, None).expect("register");
        assert_ne!(key_a, key_c);

        // unless the caller explicitly asks for the old key back
        let d = SessionNode::new("Thing");
        let key_d = NodePool::register(&pool, &d, Some(key_a.clone())).expect("register");
        assert_eq!(key_a, key_d);
    }
}
