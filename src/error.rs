//! Error types for document editing.

use thiserror::Error;

/// Errors raised while loading, editing or saving an MEI document.
#[derive(Error, Debug)]
pub enum EditError {
    /// An ID argument does not resolve to a live node.
    #[error("Element not found: {0}")]
    NotFound(String),

    /// A required structural precondition does not hold.
    #[error("Invalid document state: {0}")]
    InvalidState(String),

    /// A document-wide invariant is broken.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("MEI parse error: {0}")]
    Parse(String),

    #[error("MEI write error: {0}")]
    Serialize(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<roxmltree::Error> for EditError {
    fn from(e: roxmltree::Error) -> Self {
        EditError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
