//! The display tree: rows of cells mirroring a subset of the document
//!
//! A view row corresponds to one accepted document node; its cells are
//! either plain labels or backed by a (node, role) pair. Cells hold weak
//! node handles, so a stale projection renders empty instead of dangling.

use arbor_model::{NodeKey, NodeRef, Role, Value, WeakNodeRef};

/// How a cell wants to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayHint {
    Label,
    Editable,
}

enum CellContent {
    Static(String),
    Bound { node: WeakNodeRef, role: Role },
}

/// One column of a view row.
pub struct ViewCell {
    content: CellContent,
    hint: DisplayHint,
    dirty: bool,
}

impl ViewCell {
    /// A fixed-text cell, not backed by the document.
    pub fn label(text: impl Into<String>) -> Self {
        Self {
            content: CellContent::Static(text.into()),
            hint: DisplayHint::Label,
            dirty: false,
        }
    }

    /// A cell showing the `role` slot of `node`.
    pub fn bound(node: &NodeRef, role: Role, hint: DisplayHint) -> Self {
        Self {
            content: CellContent::Bound {
                node: std::rc::Rc::downgrade(node),
                role,
            },
            hint,
            dirty: false,
        }
    }

    /// The backed role, if any.
    pub fn role(&self) -> Option<Role> {
        match &self.content {
            CellContent::Static(_) => None,
            CellContent::Bound { role, .. } => Some(*role),
        }
    }

    pub fn hint(&self) -> DisplayHint {
        self.hint
    }

    /// Current display text. A dead backing node renders empty.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Static(text) => text.clone(),
            CellContent::Bound { node, role } => match node.upgrade() {
                Some(node) => {
                    let n = node.borrow();
                    if *role == Role::DISPLAY {
                        n.display_name()
                    } else {
                        n.data(*role).map(Value::display_text).unwrap_or_default()
                    }
                }
                None => String::new(),
            },
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// One row of the projection, mirroring one document node.
pub struct ViewRow {
    key: Option<NodeKey>,
    cells: Vec<ViewCell>,
    children: Vec<ViewRow>,
}

impl ViewRow {
    /// The invisible root row anchoring the projection.
    pub fn anchor() -> Self {
        Self {
            key: None,
            cells: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn new(key: Option<NodeKey>, cells: Vec<ViewCell>) -> Self {
        Self {
            key,
            cells,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn cells(&self) -> &[ViewCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [ViewCell] {
        &mut self.cells
    }

    pub fn children(&self) -> &[ViewRow] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ViewRow> {
        &mut self.children
    }

    /// Depth-first search for the row mirroring `key`.
    pub fn find(&self, key: &str) -> Option<&ViewRow> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.find(key) {
                return Some(found);
            }
        }
        None
    }

    pub(crate) fn find_mut(&mut self, key: &str) -> Option<&mut ViewRow> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(found) = child.find_mut(key) {
                return Some(found);
            }
        }
        None
    }

    /// Removes and returns the descendant row mirroring `key`.
    pub(crate) fn remove_descendant(&mut self, key: &str) -> Option<ViewRow> {
        if let Some(index) = self
            .children
            .iter()
            .position(|c| c.key.as_deref() == Some(key))
        {
            return Some(self.children.remove(index));
        }
        for child in &mut self.children {
            if let Some(row) = child.remove_descendant(key) {
                return Some(row);
            }
        }
        None
    }

    /// Number of rows in this subtree, the row itself included.
    pub fn row_count(&self) -> usize {
        1 + self.children.iter().map(ViewRow::row_count).sum::<usize>()
    }
}

/// The projection tree handed to views.
pub struct ViewModel {
    root: ViewRow,
}

impl ViewModel {
    pub fn new() -> Self {
        Self {
            root: ViewRow::anchor(),
        }
    }

    pub fn root(&self) -> &ViewRow {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut ViewRow {
        &mut self.root
    }

    pub(crate) fn set_root(&mut self, root: ViewRow) {
        self.root = root;
    }

    /// Total number of rows, the anchor excluded.
    pub fn row_count(&self) -> usize {
        self.root.row_count() - 1
    }

    /// Drains the dirty markers, returning (key, role) per changed cell.
    pub fn take_dirty(&mut self) -> Vec<(NodeKey, Role)> {
        let mut changed = Vec::new();
        fn walk(row: &mut ViewRow, changed: &mut Vec<(NodeKey, Role)>) {
            let key = row.key.clone();
            for cell in row.cells_mut() {
                if cell.is_dirty() {
                    if let (Some(key), Some(role)) = (key.clone(), cell.role()) {
                        changed.push((key, role));
                    }
                    cell.clear_dirty();
                }
            }
            for child in row.children_mut() {
                walk(child, changed);
            }
        }
        walk(&mut self.root, &mut changed);
        changed
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}
