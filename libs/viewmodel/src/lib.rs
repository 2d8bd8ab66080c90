//! Arbor view model
//!
//! Projects a session-model subtree into a display-oriented tree of rows
//! and cells, kept live through incremental updates driven by the
//! model's mutation notifications. Views render the projection without
//! knowing the document's internal shape.

pub mod controller;
pub mod strategies;
pub mod viewitem;

pub use controller::ViewModelController;
pub use strategies::{accepted_children, AllChildren, ChildrenStrategy, DataItems, LabelDataRow, LabelRow, RowStrategy};
pub use viewitem::{DisplayHint, ViewCell, ViewModel, ViewRow};
