//! Pluggable projection policies
//!
//! A children strategy decides which document children become rows; a
//! row strategy decides how many cells a row carries and what each one
//! shows. Both are chosen per document type when wiring a controller.

use arbor_model::{NodeRef, Role, SessionNode};

use crate::viewitem::{DisplayHint, ViewCell};

/// Decides row membership.
pub trait ChildrenStrategy {
    fn accepts(&self, node: &SessionNode) -> bool;
}

/// Every child becomes a row.
pub struct AllChildren;

impl ChildrenStrategy for AllChildren {
    fn accepts(&self, _node: &SessionNode) -> bool {
        true
    }
}

/// Only children carrying a primary value become rows.
pub struct DataItems;

impl ChildrenStrategy for DataItems {
    fn accepts(&self, node: &SessionNode) -> bool {
        node.has_data(Role::DATA)
    }
}

/// The children of `parent` the strategy accepts, in tag order then
/// insertion order.
pub fn accepted_children(parent: &NodeRef, strategy: &dyn ChildrenStrategy) -> Vec<NodeRef> {
    parent
        .borrow()
        .tags()
        .all_children()
        .into_iter()
        .filter(|child| strategy.accepts(&child.borrow()))
        .collect()
}

/// Decides the shape of one row.
pub trait RowStrategy {
    /// Ordered cells for the row mirroring `node`.
    fn columns_for(&self, node: &NodeRef) -> Vec<ViewCell>;
}

/// A single label column showing the display name.
pub struct LabelRow;

impl RowStrategy for LabelRow {
    fn columns_for(&self, node: &NodeRef) -> Vec<ViewCell> {
        vec![ViewCell::bound(node, Role::DISPLAY, DisplayHint::Label)]
    }
}

/// Two columns: the display name and the primary value. The value cell
/// is editable only while the node is both editable and enabled.
pub struct LabelDataRow;

impl RowStrategy for LabelDataRow {
    fn columns_for(&self, node: &NodeRef) -> Vec<ViewCell> {
        let hint = {
            let n = node.borrow();
            if n.is_editable() && n.is_enabled() {
                DisplayHint::Editable
            } else {
                DisplayHint::Label
            }
        };
        vec![
            ViewCell::bound(node, Role::DISPLAY, DisplayHint::Label),
            ViewCell::bound(node, Role::DATA, hint),
        ]
    }
}
