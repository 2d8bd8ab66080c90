//! Data roles and the tagged value union stored in node data slots
//!
//! A node carries an open set of data slots keyed by [`Role`]. Each slot
//! holds a [`Value`], a closed sum over the kinds the engine understands.
//! The persisted encoding is self-describing (`kind`/`value` adjacent
//! tagging) so decoding never needs an external schema.

use serde::{Deserialize, Serialize};

/// Identifies which aspect of a node a data slot describes.
///
/// Roles are plain integers on the wire; the constants below cover the
/// roles the engine itself interprets. Applications may define further
/// roles above [`Role::USER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub i32);

impl Role {
    /// Unique registry key of the node.
    pub const IDENTIFIER: Role = Role(0);
    /// Primary editable value.
    pub const DATA: Role = Role(1);
    /// Human-readable label.
    pub const DISPLAY: Role = Role(2);
    /// Enabled/editable flags, see [`crate::node::appearance`].
    pub const APPEARANCE: Role = Role(3);
    /// Hover text.
    pub const TOOLTIP: Role = Role(4);
    /// Editor limits for the primary value.
    pub const LIMITS: Role = Role(5);
    /// First role free for application use.
    pub const USER: Role = Role(100);
}

/// Discriminant of a [`Value`], used for compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    Text,
    Combo,
    External,
}

/// A combo-box style selection: the full option list plus the chosen index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboValue {
    pub options: Vec<String>,
    pub index: usize,
}

impl ComboValue {
    pub fn new(options: Vec<String>, index: usize) -> Self {
        Self { options, index }
    }

    /// The currently selected option, if the index is in range.
    pub fn selected(&self) -> Option<&str> {
        self.options.get(self.index).map(String::as_str)
    }
}

/// A reference to something outside the document (e.g. a linked object),
/// displayed with a label and a color swatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub text: String,
    pub color: String,
    pub identifier: String,
}

/// The opaque value carried by a data slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Combo(ComboValue),
    External(ExternalRef),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Text(_) => ValueKind::Text,
            Value::Combo(_) => ValueKind::Combo,
            Value::External(_) => ValueKind::External,
        }
    }

    /// Whether `other` is indistinguishable from `self`: same kind, equal
    /// payload. Used to suppress no-op edits.
    ///
    /// `Combo` and `External` values always report as different, so edits
    /// to selection state are never swallowed even when the payload
    /// happens to compare equal.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Combo(_), Value::Combo(_)) => false,
            (Value::External(_), Value::External(_)) => false,
            _ => self == other,
        }
    }

    /// Plain-text rendering for display cells.
    pub fn display_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Text(s) => s.clone(),
            Value::Combo(c) => c.selected().unwrap_or_default().to_string(),
            Value::External(e) => e.text.clone(),
        }
    }

    /// The stored text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}
