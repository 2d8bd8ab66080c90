//! Subtree traversal helpers

use crate::node::NodeRef;

/// Visits `node` and all of its descendants, pre-order.
pub fn iterate(node: &NodeRef, visit: &mut impl FnMut(&NodeRef)) {
    visit(node);
    let children = node.borrow().tags().all_children();
    for child in &children {
        iterate(child, visit);
    }
}

/// Visits `node` and its descendants, pre-order; when the visitor returns
/// false for a node, its subtree is not entered.
pub fn iterate_if(node: &NodeRef, visit: &mut impl FnMut(&NodeRef) -> bool) {
    if !visit(node) {
        return;
    }
    let children = node.borrow().tags().all_children();
    for child in &children {
        iterate_if(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{attach_child, SessionNode};
    use crate::tags::TagDef;

    fn chain() -> NodeRef {
        let root = SessionNode::new("Root");
        root.borrow_mut()
            .register_tag(TagDef::new("items"))
            .expect("tag");
        for name in ["A", "B"] {
            let group = SessionNode::new(name);
            group
                .borrow_mut()
                .register_tag(TagDef::new("items"))
                .expect("tag");
            let leaf = SessionNode::new("Leaf");
            attach_child(&group, "items", 0, &leaf).expect("attach");
            let index = root.borrow().tags().slot("items").unwrap().len();
            attach_child(&root, "items", index, &group).expect("attach");
        }
        root
    }

    #[test]
    fn iterate_visits_all_nodes_preorder() {
        let root = chain();
        let mut seen = Vec::new();
        iterate(&root, &mut |node| {
            seen.push(node.borrow().node_type().to_string())
        });
        assert_eq!(seen, ["Root", "A", "Leaf", "B", "Leaf"]);
    }

    #[test]
    fn iterate_if_prunes_rejected_branches() {
        let root = chain();
        let mut seen = Vec::new();
        iterate_if(&root, &mut |node| {
            let ty = node.borrow().node_type().to_string();
            let descend = ty != "A";
            seen.push(ty);
            descend
        });
        assert_eq!(seen, ["Root", "A", "B", "Leaf"]);
    }
}
