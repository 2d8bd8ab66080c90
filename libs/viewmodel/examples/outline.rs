//! End-to-end wiring demo: build a small document, project it, edit it,
//! undo, and print the resulting outline after each step.
//!
//! Run with `cargo run -p arbor-viewmodel --example outline`.

use arbor_model::{ConverterFlags, Path, Role, SessionModel, TagDef, TypeCatalog, Value};
use arbor_viewmodel::{AllChildren, LabelDataRow, ViewModelController, ViewRow};

fn print_row(row: &ViewRow, depth: usize) {
    let cells: Vec<String> = row.cells().iter().map(|c| c.text()).collect();
    println!("{}- {}", "  ".repeat(depth), cells.join(" | "));
    for child in row.children() {
        print_row(child, depth + 1);
    }
}

fn print_outline(label: &str, controller: &ViewModelController) {
    println!("{label}:");
    for row in controller.view().root().children() {
        print_row(row, 1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut catalog = TypeCatalog::new();
    catalog.register_simple("Group", vec![TagDef::new("items")]);
    catalog.register_simple("Property", vec![]);

    let mut model = SessionModel::new(catalog);
    model
        .register_root_tag(TagDef::new("items"))
        .expect("root tag");

    let group = model
        .insert_node("Group", &Path::root(), "items", 0)
        .expect("insert group");
    model
        .set_value(&group, Role::DISPLAY, Value::Text("Material".into()))
        .expect("set");

    let thickness = model
        .insert_node("Property", &group, "items", 0)
        .expect("insert property");
    model
        .set_value(&thickness, Role::DISPLAY, Value::Text("thickness".into()))
        .expect("set");
    model
        .set_value(&thickness, Role::DATA, Value::Double(42.0))
        .expect("set");

    let mut controller = ViewModelController::new(AllChildren, LabelDataRow);
    controller
        .attach(&mut model, &Path::root())
        .expect("attach");
    print_outline("initial", &controller);

    model
        .set_value(&thickness, Role::DATA, Value::Double(43.5))
        .expect("set");
    for (key, role) in controller.take_dirty() {
        println!("changed: {key} role {}", role.0);
    }
    print_outline("after edit", &controller);

    model.undo().expect("undo");
    print_outline("after undo", &controller);

    let json = model
        .to_json_string(ConverterFlags::CLONE)
        .expect("serialize");
    println!("persisted form: {json}");
}
