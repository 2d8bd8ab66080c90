//! Projection controller behavior: initial build, incremental row
//! insertion/removal, dirty-cell marking, region filtering, detach.

use arbor_model::{
    ConverterFlags, NodeRef, Path, Role, SessionModel, TagDef, TypeCatalog, Value,
};
use arbor_viewmodel::{
    AllChildren, ChildrenStrategy, DataItems, DisplayHint, LabelDataRow, LabelRow, RowStrategy,
    ViewCell, ViewModelController,
};

fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    catalog.register_simple("Group", vec![TagDef::new("items")]);
    catalog.register_simple("Item", vec![]);
    catalog
}

fn model() -> SessionModel {
    let mut model = SessionModel::new(catalog());
    model
        .register_root_tag(TagDef::new("items"))
        .expect("root tag");
    model
}

fn labeled_item(model: &mut SessionModel, parent: &Path, index: usize, label: &str) -> Path {
    let path = model
        .insert_node("Item", parent, "items", index)
        .expect("insert");
    model
        .set_value(&path, Role::DISPLAY, Value::Text(label.into()))
        .expect("set");
    path
}

fn top_labels(controller: &ViewModelController) -> Vec<String> {
    controller
        .view()
        .root()
        .children()
        .iter()
        .map(|row| row.cells()[0].text())
        .collect()
}

#[test]
fn attach_builds_the_initial_projection() {
    let mut model = model();
    let group = model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert");
    labeled_item(&mut model, &group, 0, "a");
    labeled_item(&mut model, &group, 1, "b");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    assert!(controller.is_attached());

    let view = controller.view();
    assert_eq!(view.row_count(), 3);
    let group_row = &view.root().children()[0];
    assert_eq!(group_row.cells()[0].text(), "Group");
    assert_eq!(group_row.children().len(), 2);
    assert_eq!(group_row.children()[0].cells()[0].text(), "a");
    assert_eq!(group_row.children()[1].cells()[0].text(), "b");
}

#[test]
fn attach_to_missing_path_fails() {
    let mut model = model();
    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    let err = controller
        .attach(&mut model, &Path::root().child("items", 0))
        .err()
        .expect("must fail");
    assert!(matches!(err, arbor_model::ModelError::InvalidPath(_)));
    assert!(!controller.is_attached());
}

#[test]
fn insertion_adds_exactly_one_row_at_the_matching_position() {
    let mut model = model();
    labeled_item(&mut model, &Path::root(), 0, "first");
    labeled_item(&mut model, &Path::root(), 1, "third");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    assert_eq!(top_labels(&controller), ["first", "third"]);

    labeled_item(&mut model, &Path::root(), 1, "second");
    assert_eq!(top_labels(&controller), ["first", "second", "third"]);
    assert_eq!(controller.view().row_count(), 3);
}

#[test]
fn removal_drops_exactly_that_row() {
    let mut model = model();
    let group = model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert");
    labeled_item(&mut model, &group, 0, "a");
    labeled_item(&mut model, &Path::root(), 1, "solo");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    assert_eq!(controller.view().row_count(), 3);

    // removing the group takes its child row along, nothing else
    model.remove_node(&group).expect("remove");
    assert_eq!(controller.view().row_count(), 1);
    assert_eq!(top_labels(&controller), ["solo"]);
}

#[test]
fn children_strategy_filters_rows() {
    let mut model = model();

    let mut controller = ViewModelController::new(DataItems, LabelDataRow);
    controller.attach(&mut model, &Path::root()).expect("attach");

    // an item without a primary value is not a row
    let bare = model
        .insert_node("Item", &Path::root(), "items", 0)
        .expect("insert");
    assert_eq!(controller.view().row_count(), 0);

    // remove it, insert one that was given data before projection sees
    // it? data arrives after insertion, so membership is decided at
    // insert time: still no row
    model
        .set_value(&bare, Role::DATA, Value::Int(5))
        .expect("set");
    assert_eq!(controller.view().row_count(), 0);

    // a re-attach picks the now-qualifying child up
    controller.attach(&mut model, &Path::root()).expect("attach");
    assert_eq!(controller.view().row_count(), 1);
}

#[test]
fn data_change_marks_only_the_matching_cell() {
    let mut model = model();
    let a = labeled_item(&mut model, &Path::root(), 0, "a");
    let b = labeled_item(&mut model, &Path::root(), 1, "b");
    model
        .set_value(&a, Role::DATA, Value::Int(1))
        .expect("set");
    model
        .set_value(&b, Role::DATA, Value::Int(2))
        .expect("set");

    let mut controller = ViewModelController::new(AllChildren, LabelDataRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    controller.take_dirty(); // settle

    model
        .set_value(&a, Role::DATA, Value::Int(10))
        .expect("set");
    let a_key = model.key_at(&a).expect("key");
    let dirty = controller.take_dirty();
    assert_eq!(dirty, vec![(a_key, Role::DATA)]);

    // drained: a second take reports nothing
    assert!(controller.take_dirty().is_empty());
}

#[test]
fn events_outside_the_attached_region_are_ignored() {
    let mut model = model();
    let tracked = model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert");
    let other = model
        .insert_node("Group", &Path::root(), "items", 1)
        .expect("insert");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &tracked).expect("attach");
    assert_eq!(controller.view().row_count(), 0);

    labeled_item(&mut model, &other, 0, "elsewhere");
    assert_eq!(controller.view().row_count(), 0);

    labeled_item(&mut model, &tracked, 0, "here");
    assert_eq!(controller.view().row_count(), 1);
}

#[test]
fn undo_and_redo_keep_the_projection_in_step() {
    let mut model = model();
    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");

    labeled_item(&mut model, &Path::root(), 0, "a");
    assert_eq!(controller.view().row_count(), 1);

    model.undo().expect("undo"); // un-label
    model.undo().expect("undo"); // un-insert
    assert_eq!(controller.view().row_count(), 0);

    model.redo().expect("redo");
    assert_eq!(controller.view().row_count(), 1);
}

#[test]
fn moves_keep_row_order_matching_the_document() {
    let mut model = model();
    for (i, label) in ["a", "b", "c"].iter().enumerate() {
        labeled_item(&mut model, &Path::root(), i, label);
    }

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");

    model
        .move_node(&Path::root().child("items", 0), &Path::root(), "items", 2)
        .expect("move");
    assert_eq!(top_labels(&controller), ["b", "c", "a"]);

    model.undo().expect("undo");
    assert_eq!(top_labels(&controller), ["a", "b", "c"]);
}

#[test]
fn detach_discards_the_projection_and_unsubscribes() {
    let mut model = model();
    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    labeled_item(&mut model, &Path::root(), 0, "a");
    assert_eq!(controller.view().row_count(), 1);

    controller.detach(&mut model);
    assert!(!controller.is_attached());
    assert_eq!(controller.view().row_count(), 0);

    labeled_item(&mut model, &Path::root(), 1, "b");
    assert_eq!(controller.view().row_count(), 0);
}

#[test]
fn removing_the_attached_root_empties_the_projection() {
    let mut model = model();
    let group = model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert");
    labeled_item(&mut model, &group, 0, "a");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &group).expect("attach");
    assert_eq!(controller.view().row_count(), 1);

    model.remove_node(&group).expect("remove");
    assert!(!controller.is_attached());
    assert_eq!(controller.view().row_count(), 0);
}

#[test]
fn reload_reprojects_the_document() {
    let mut model = model();
    labeled_item(&mut model, &Path::root(), 0, "a");
    let saved = model.to_structured(ConverterFlags::CLONE);
    labeled_item(&mut model, &Path::root(), 1, "b");

    let mut controller = ViewModelController::new(AllChildren, LabelRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    assert_eq!(controller.view().row_count(), 2);

    model
        .load_structured(ConverterFlags::CLONE, &saved)
        .expect("load");
    assert_eq!(top_labels(&controller), ["a"]);
}

#[test]
fn editability_drives_the_cell_hint() {
    let mut model = model();
    let a = labeled_item(&mut model, &Path::root(), 0, "a");
    model
        .set_value(&a, Role::DATA, Value::Int(1))
        .expect("set");
    let node: NodeRef = model.node_at(&a).expect("node");
    node.borrow_mut().set_editable(false);

    let mut controller = ViewModelController::new(AllChildren, LabelDataRow);
    controller.attach(&mut model, &Path::root()).expect("attach");
    let view = controller.view();
    let cells = view.root().children()[0].cells();
    assert_eq!(cells[1].hint(), DisplayHint::Label);
}

/// A strategy mixing a fixed header label into every row, exercising
/// plain label cells next to bound ones.
struct TaggedRow;

impl RowStrategy for TaggedRow {
    fn columns_for(&self, node: &NodeRef) -> Vec<ViewCell> {
        vec![
            ViewCell::label(node.borrow().node_type().to_string()),
            ViewCell::bound(node, Role::DISPLAY, DisplayHint::Label),
        ]
    }
}

struct GroupsOnly;

impl ChildrenStrategy for GroupsOnly {
    fn accepts(&self, node: &arbor_model::SessionNode) -> bool {
        node.node_type() == "Group"
    }
}

#[test]
fn custom_strategies_compose() {
    let mut model = model();
    model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert");
    labeled_item(&mut model, &Path::root(), 1, "ignored");

    let mut controller = ViewModelController::new(GroupsOnly, TaggedRow);
    controller.attach(&mut model, &Path::root()).expect("attach");

    let view = controller.view();
    assert_eq!(view.row_count(), 1);
    let row = &view.root().children()[0];
    assert_eq!(row.cells()[0].text(), "Group");
    assert!(row.cells()[0].role().is_none());
    assert_eq!(row.cells()[1].role(), Some(Role::DISPLAY));
}
