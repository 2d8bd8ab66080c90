//! Mutation notifications
//!
//! The model notifies its observers synchronously, inline, after each
//! successful mutation; observers see a fully consistent document and
//! must complete before the mutating call returns. Observers must not
//! mutate the model from inside a callback.

use crate::node::NodeRef;
use crate::path::Path;
use crate::value::Role;

/// A structural or data change in the document.
///
/// Events carry both the path of the affected location and a live handle
/// to the node(s) involved, so observers can inspect the document without
/// going back through the model.
#[derive(Clone)]
pub enum ModelEvent {
    /// A node was inserted under `parent` at `tag`/`index`.
    Inserted {
        parent: NodeRef,
        parent_path: Path,
        tag: String,
        index: usize,
    },
    /// `node` is about to leave the document; it is still fully attached
    /// when this fires.
    AboutToRemove { node: NodeRef, path: Path },
    /// The child previously at `tag`/`index` under `parent` is gone.
    Removed {
        parent: NodeRef,
        parent_path: Path,
        tag: String,
        index: usize,
    },
    /// The data slot `role` of `node` changed (set, replaced or cleared).
    DataChanged {
        node: NodeRef,
        path: Path,
        role: Role,
    },
    /// The whole document was replaced (e.g. a project load). Projections
    /// must re-resolve what they track.
    Reset,
}

pub type ObserverId = usize;

type Callback = Box<dyn FnMut(&ModelEvent)>;

/// The model's synchronous observer list.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: ObserverId,
    entries: Vec<(ObserverId, Callback)>,
}

impl Observers {
    pub fn subscribe(&mut self, callback: Callback) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn notify(&mut self, event: &ModelEvent) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }
}
