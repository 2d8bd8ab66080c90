//! The session model: document root, registry, history and notifications
//!
//! All external mutation of the document goes through [`SessionModel`]'s
//! command-backed operations; direct tree surgery is reserved for nodes
//! that are not (yet) part of a model. Observers are notified inline,
//! after each successful mutation, and must not mutate the model from
//! inside a callback.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::commands::{InsertNodeCommand, MoveNodeCommand, RemoveNodeCommand, SetValueCommand};
use crate::convert::{
    collect_identifiers, populate, to_structured, ConverterContext, ConverterFlags, StructuredNode,
};
use crate::error::{ModelError, ModelResult};
use crate::event::{ModelEvent, ObserverId, Observers};
use crate::factory::NodeFactory;
use crate::history::CommandHistory;
use crate::node::{NodeRef, SessionNode};
use crate::path::Path;
use crate::pool::{NodeKey, NodePool, PoolRef};
use crate::tags::TagDef;
use crate::utils::iterate;
use crate::value::{Role, Value};

/// Type tag of the document root.
pub const ROOT_TYPE: &str = "Root";

/// The mutable document state commands operate on: root node, registry,
/// factory and observer list. Split from the history so a command can
/// borrow the core mutably while the history drives it.
pub struct ModelCore {
    root: NodeRef,
    pool: PoolRef,
    factory: Rc<dyn NodeFactory>,
    observers: Observers,
}

impl ModelCore {
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn pool(&self) -> &PoolRef {
        &self.pool
    }

    pub fn factory(&self) -> &Rc<dyn NodeFactory> {
        &self.factory
    }

    pub(crate) fn resolve(&self, path: &Path) -> ModelResult<NodeRef> {
        path.resolve(&self.root)
            .ok_or_else(|| ModelError::InvalidPath(path.to_string()))
    }

    pub(crate) fn resolve_parent(&self, path: &Path) -> ModelResult<NodeRef> {
        path.resolve(&self.root)
            .ok_or_else(|| ModelError::InvalidParent(path.to_string()))
    }

    pub(crate) fn path_of(&self, node: &NodeRef) -> ModelResult<Path> {
        Path::of(node, &self.root)
            .ok_or_else(|| ModelError::InvalidPath("node is not in this document".into()))
    }

    pub(crate) fn notify(&mut self, event: ModelEvent) {
        self.observers.notify(&event);
    }

    /// Context used for undo backups and their restoration: an exact
    /// clone, identifiers included.
    pub(crate) fn backup_context(&self) -> ConverterContext {
        ConverterContext::new(self.factory.clone(), ConverterFlags::CLONE)
    }

    /// Registers every node of `subtree` under its carried key (minting
    /// one where absent). Rolls back on the first failure so a collision
    /// leaves the registry as it was.
    pub(crate) fn register_subtree(&self, subtree: &NodeRef) -> ModelResult<()> {
        let mut registered: Vec<NodeRef> = Vec::new();
        let mut result = Ok(());
        iterate(subtree, &mut |node| {
            if result.is_err() {
                return;
            }
            let key = node.borrow().key();
            if let Some(ref k) = key {
                let already = self
                    .pool
                    .borrow()
                    .resolve(k)
                    .is_some_and(|n| Rc::ptr_eq(&n, node));
                if already {
                    return;
                }
            }
            match NodePool::register(&self.pool, node, key) {
                Ok(_) => registered.push(node.clone()),
                Err(err) => result = Err(err),
            }
        });
        if result.is_err() {
            for node in &registered {
                let _ = NodePool::deregister(&self.pool, node);
            }
        }
        result
    }

    /// Removes every node of `subtree` from the registry. Nodes that are
    /// not registered here are skipped.
    pub(crate) fn deregister_subtree(&self, subtree: &NodeRef) {
        iterate(subtree, &mut |node| {
            let registered = node
                .borrow()
                .key()
                .and_then(|k| self.pool.borrow().resolve(&k))
                .is_some_and(|n| Rc::ptr_eq(&n, node));
            if registered {
                let _ = NodePool::deregister(&self.pool, node);
            }
        });
    }
}

pub struct SessionModel {
    core: ModelCore,
    history: CommandHistory,
}

impl SessionModel {
    /// A model with its own private registry.
    pub fn new(factory: impl NodeFactory + 'static) -> Self {
        Self::with_pool(factory, NodePool::new_shared())
    }

    /// A model sharing `pool` with other models; key uniqueness then
    /// spans all of them.
    pub fn with_pool(factory: impl NodeFactory + 'static, pool: PoolRef) -> Self {
        let root = SessionNode::new(ROOT_TYPE);
        // a fresh root in a live pool cannot collide
        let _ = NodePool::register(&pool, &root, None);
        Self {
            core: ModelCore {
                root,
                pool,
                factory: Rc::new(factory),
                observers: Observers::default(),
            },
            history: CommandHistory::new(),
        }
    }

    /// Declares a child group on the document root.
    pub fn register_root_tag(&mut self, def: TagDef) -> ModelResult<()> {
        self.core.root.borrow_mut().register_tag(def)
    }

    pub fn root(&self) -> &NodeRef {
        self.core.root()
    }

    pub fn pool(&self) -> PoolRef {
        self.core.pool.clone()
    }

    pub fn core(&self) -> &ModelCore {
        &self.core
    }

    /// The node at `path`, if it exists.
    pub fn node_at(&self, path: &Path) -> Option<NodeRef> {
        path.resolve(&self.core.root)
    }

    /// The registered node behind `key`, if it is live.
    pub fn resolve_key(&self, key: &str) -> Option<NodeRef> {
        self.core.pool.borrow().resolve(key)
    }

    /// The registry key of the node at `path`.
    pub fn key_at(&self, path: &Path) -> Option<NodeKey> {
        self.node_at(path).and_then(|node| node.borrow().key())
    }

    // ---- mutation surface --------------------------------------------

    /// Inserts a fresh node of `node_type` under `parent_path` at
    /// `tag`/`index` and returns its path.
    pub fn insert_node(
        &mut self,
        node_type: &str,
        parent_path: &Path,
        tag: &str,
        index: usize,
    ) -> ModelResult<Path> {
        let command = InsertNodeCommand::new(node_type, parent_path.clone(), tag, index);
        self.history.execute(&mut self.core, Box::new(command))?;
        Ok(parent_path.child(tag, index))
    }

    /// Removes the subtree at `path`; its registry entries are released
    /// and a structured backup is retained for undo.
    pub fn remove_node(&mut self, path: &Path) -> ModelResult<()> {
        let command = RemoveNodeCommand::new(path.clone());
        self.history.execute(&mut self.core, Box::new(command))
    }

    /// Stores `value` under `role` at `path`. Returns `Ok(false)` without
    /// touching history or observers when the stored value is
    /// indistinguishable from `value`.
    pub fn set_value(&mut self, path: &Path, role: Role, value: Value) -> ModelResult<bool> {
        let node = self.core.resolve(path)?;
        let unchanged = node
            .borrow()
            .data(role)
            .is_some_and(|current| current.is_same(&value));
        if unchanged {
            return Ok(false);
        }
        let command = SetValueCommand::new(path.clone(), role, Some(value));
        self.history.execute(&mut self.core, Box::new(command))?;
        Ok(true)
    }

    /// Removes the data slot `role` at `path`. `Ok(false)` when the slot
    /// was already absent.
    pub fn clear_value(&mut self, path: &Path, role: Role) -> ModelResult<bool> {
        let node = self.core.resolve(path)?;
        if !node.borrow().has_data(role) {
            return Ok(false);
        }
        let command = SetValueCommand::new(path.clone(), role, None);
        self.history.execute(&mut self.core, Box::new(command))?;
        Ok(true)
    }

    /// Moves the node at `source` under `dest_parent` at
    /// `dest_tag`/`dest_index` (the index addresses the destination tag
    /// after the source is detached). Cycles and capacity violations fail
    /// with [`ModelError::InvalidMove`] and leave the tree untouched.
    pub fn move_node(
        &mut self,
        source: &Path,
        dest_parent: &Path,
        dest_tag: &str,
        dest_index: usize,
    ) -> ModelResult<()> {
        let command =
            MoveNodeCommand::new(source.clone(), dest_parent.clone(), dest_tag, dest_index);
        self.history.execute(&mut self.core, Box::new(command))
    }

    // ---- history ------------------------------------------------------

    pub fn undo(&mut self) -> ModelResult<()> {
        self.history.undo(&mut self.core)
    }

    pub fn redo(&mut self) -> ModelResult<()> {
        self.history.redo(&mut self.core)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Drops all undo/redo state, including a corrupted marker.
    pub fn reset_history(&mut self) {
        self.history.reset();
    }

    // ---- observation --------------------------------------------------

    pub fn subscribe(&mut self, callback: impl FnMut(&ModelEvent) + 'static) -> ObserverId {
        self.core.observers.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.core.observers.unsubscribe(id);
    }

    // ---- persistence --------------------------------------------------

    /// Serializes the whole document.
    pub fn to_structured(&self, flags: ConverterFlags) -> StructuredNode {
        let ctx = ConverterContext::new(self.core.factory.clone(), flags);
        to_structured(&self.core.root, &ctx)
    }

    pub fn to_json_string(&self, flags: ConverterFlags) -> ModelResult<String> {
        serde_json::to_string(&self.to_structured(flags))
            .map_err(|err| ModelError::SchemaMismatch(err.to_string()))
    }

    /// Replaces the document content with `tree`.
    ///
    /// Under `reuse_identifier`, keys arriving from the structured form
    /// must not collide with live registrations outside this document;
    /// a collision fails with [`ModelError::DuplicateKey`] before
    /// anything is touched. Loading resets the history and emits
    /// [`ModelEvent::Reset`].
    pub fn load_structured(
        &mut self,
        flags: ConverterFlags,
        tree: &StructuredNode,
    ) -> ModelResult<()> {
        let root_type = self.core.root.borrow().node_type().to_string();
        if tree.node_type != root_type {
            return Err(ModelError::TypeMismatch {
                expected: root_type,
                found: tree.node_type.clone(),
            });
        }
        if flags.reuse_identifier {
            let mut incoming = Vec::new();
            collect_identifiers(tree, &mut incoming);
            let mut own = HashSet::new();
            iterate(&self.core.root, &mut |node| {
                if let Some(key) = node.borrow().key() {
                    own.insert(key);
                }
            });
            for key in &incoming {
                if !own.contains(key) && self.core.pool.borrow().resolve(key).is_some() {
                    return Err(ModelError::DuplicateKey(key.clone()));
                }
            }
        }

        let root = self.core.root.clone();
        self.core.deregister_subtree(&root);
        let ctx = ConverterContext::new(self.core.factory.clone(), flags);
        populate(tree, &root, &ctx)?;
        self.core.register_subtree(&root)?;
        self.history.reset();
        debug!("document loaded");
        self.core.notify(ModelEvent::Reset);
        Ok(())
    }

    pub fn load_json_str(&mut self, flags: ConverterFlags, json: &str) -> ModelResult<()> {
        let tree: StructuredNode = serde_json::from_str(json)
            .map_err(|err| ModelError::SchemaMismatch(err.to_string()))?;
        self.load_structured(flags, &tree)
    }
}
