//! Error types for the arbor session model

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Everything that can go wrong while mutating, addressing or persisting
/// a session model.
///
/// Registry errors (`DuplicateKey`, `NotRegistered`) signal a contract
/// violation in the caller; structural errors leave the document untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("key {0:?} is already registered")]
    DuplicateKey(String),

    #[error("node is not registered")]
    NotRegistered,

    #[error("tag {0:?} is already registered on this node")]
    DuplicateTag(String),

    #[error("path {0} does not resolve to a node")]
    InvalidPath(String),

    #[error("parent location does not exist: {0}")]
    InvalidParent(String),

    #[error("tag {tag:?} cannot hold more than {max} children")]
    TagCapacityExceeded { tag: String, max: usize },

    #[error("unknown node type {0:?}")]
    UnknownType(String),

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("structured form is malformed: {0}")]
    SchemaMismatch(String),

    #[error("declared type {found:?} does not match target type {expected:?}")]
    TypeMismatch { expected: String, found: String },

    #[error("command history is corrupted and must be reset")]
    HistoryCorrupted,
}
