//! Keeps a view model synchronized with a session model
//!
//! The controller subscribes to the model's notifications and applies
//! incremental diffs to the projection: one row inserted per accepted
//! insertion, one row subtree dropped per removal, one dirty marker per
//! data change. The projection is never rebuilt wholesale after attach,
//! with one exception: a document reset re-projects the tracked subtree.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::trace;

use arbor_model::{
    ModelError, ModelEvent, ModelResult, NodeKey, NodeRef, ObserverId, Path, Role, SessionModel,
    WeakNodeRef,
};

use crate::strategies::{accepted_children, ChildrenStrategy, RowStrategy};
use crate::viewitem::{ViewModel, ViewRow};

enum ControllerState {
    Detached,
    Attached { root: WeakNodeRef },
}

struct ControllerInner {
    state: ControllerState,
    children_strategy: Box<dyn ChildrenStrategy>,
    row_strategy: Box<dyn RowStrategy>,
    view: ViewModel,
}

/// Projects a subtree of a session model into a [`ViewModel`].
///
/// State machine: detached → attached(root path) → detached. While
/// attached, the controller reacts inline to every model notification;
/// remember to [`detach`](Self::detach) before dropping it, otherwise
/// the stale subscription stays on the model.
pub struct ViewModelController {
    inner: Rc<RefCell<ControllerInner>>,
    subscription: Option<ObserverId>,
}

impl ViewModelController {
    pub fn new(
        children_strategy: impl ChildrenStrategy + 'static,
        row_strategy: impl RowStrategy + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                state: ControllerState::Detached,
                children_strategy: Box::new(children_strategy),
                row_strategy: Box::new(row_strategy),
                view: ViewModel::new(),
            })),
            subscription: None,
        }
    }

    /// Builds the initial projection beneath `root_path` and subscribes.
    /// Attaching while attached detaches first.
    pub fn attach(&mut self, model: &mut SessionModel, root_path: &Path) -> ModelResult<()> {
        if self.subscription.is_some() {
            self.detach(model);
        }
        let root = model
            .node_at(root_path)
            .ok_or_else(|| ModelError::InvalidPath(root_path.to_string()))?;
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = ControllerState::Attached {
                root: Rc::downgrade(&root),
            };
            inner.rebuild(&root);
        }
        let handler = Rc::clone(&self.inner);
        self.subscription = Some(model.subscribe(move |event| {
            handler.borrow_mut().handle(event);
        }));
        Ok(())
    }

    /// Discards the projection and unsubscribes.
    pub fn detach(&mut self, model: &mut SessionModel) {
        if let Some(id) = self.subscription.take() {
            model.unsubscribe(id);
        }
        let mut inner = self.inner.borrow_mut();
        inner.state = ControllerState::Detached;
        inner.view = ViewModel::new();
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.inner.borrow().state, ControllerState::Attached { .. })
    }

    /// Read access to the projection.
    pub fn view(&self) -> Ref<'_, ViewModel> {
        Ref::map(self.inner.borrow(), |inner| &inner.view)
    }

    /// Drains the dirty cell markers.
    pub fn take_dirty(&self) -> Vec<(NodeKey, Role)> {
        self.inner.borrow_mut().view.take_dirty()
    }
}

impl ControllerInner {
    fn rebuild(&mut self, root: &NodeRef) {
        let mut anchor = ViewRow::anchor();
        for child in accepted_children(root, self.children_strategy.as_ref()) {
            anchor
                .children_mut()
                .push(build_row(&child, self.children_strategy.as_ref(), self.row_strategy.as_ref()));
        }
        self.view.set_root(anchor);
    }

    fn handle(&mut self, event: &ModelEvent) {
        let root = match &self.state {
            ControllerState::Attached { root } => root.upgrade(),
            ControllerState::Detached => return,
        };
        let Some(root) = root else {
            // the tracked subtree no longer exists
            self.state = ControllerState::Detached;
            self.view = ViewModel::new();
            return;
        };

        match event {
            ModelEvent::Inserted {
                parent, tag, index, ..
            } => {
                let node = parent
                    .borrow()
                    .tags()
                    .slot(tag)
                    .and_then(|slot| slot.children().get(*index).cloned());
                let Some(node) = node else { return };
                if !within_region(parent, &root) {
                    return;
                }
                let ControllerInner {
                    children_strategy,
                    row_strategy,
                    view,
                    ..
                } = self;
                if !children_strategy.accepts(&node.borrow()) {
                    return;
                }
                let accepted = accepted_children(parent, children_strategy.as_ref());
                let Some(row_index) = accepted.iter().position(|c| Rc::ptr_eq(c, &node)) else {
                    return;
                };
                let parent_row = if Rc::ptr_eq(parent, &root) {
                    Some(view.root_mut())
                } else {
                    parent
                        .borrow()
                        .key()
                        .and_then(|key| view.root_mut().find_mut(&key))
                };
                let Some(parent_row) = parent_row else { return };
                let row = build_row(&node, children_strategy.as_ref(), row_strategy.as_ref());
                trace!(row_index, "projection row inserted");
                parent_row.children_mut().insert(row_index, row);
            }
            ModelEvent::AboutToRemove { node, .. } => {
                if Rc::ptr_eq(node, &root) {
                    self.state = ControllerState::Detached;
                    self.view = ViewModel::new();
                    return;
                }
                if let Some(key) = node.borrow().key() {
                    if self.view.root_mut().remove_descendant(&key).is_some() {
                        trace!(key = %key, "projection row removed");
                    }
                }
            }
            // the row work happened at about-to-remove time
            ModelEvent::Removed { .. } => {}
            ModelEvent::DataChanged { node, role, .. } => {
                let Some(key) = node.borrow().key() else { return };
                if let Some(row) = self.view.root_mut().find_mut(&key) {
                    for cell in row.cells_mut() {
                        if cell.role() == Some(*role) {
                            cell.mark_dirty();
                        }
                    }
                }
            }
            ModelEvent::Reset => {
                trace!("document reset, re-projecting");
                self.rebuild(&root);
            }
        }
    }
}

fn build_row(
    node: &NodeRef,
    children_strategy: &dyn ChildrenStrategy,
    row_strategy: &dyn RowStrategy,
) -> ViewRow {
    let cells = row_strategy.columns_for(node);
    let mut row = ViewRow::new(node.borrow().key(), cells);
    for child in accepted_children(node, children_strategy) {
        row.children_mut()
            .push(build_row(&child, children_strategy, row_strategy));
    }
    row
}

/// Whether `node` is `root` or one of its descendants.
fn within_region(node: &NodeRef, root: &NodeRef) -> bool {
    let mut current = node.clone();
    loop {
        if Rc::ptr_eq(&current, root) {
            return true;
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
