//! meiedit — structural editing of MEI square-notation documents.
//!
//! Loads an MEI file into an editable tree, applies symbol-level edits
//! (neumes, divisions, clefs, custodes, systems) while keeping the
//! facsimile zones and the staff layout consistent, and writes the result
//! back out.
//!
//! # Example
//! ```no_run
//! use meiedit::{load_file, save_file, BoundingBox, Editor};
//!
//! let doc = load_file("path/to/folio.mei").unwrap();
//! let mut editor = Editor::new(doc);
//! let id = editor
//!     .insert_division(Some("m-neume-3"), "final", &BoundingBox::new(10.0, 10.0, 20.0, 40.0))
//!     .unwrap();
//! println!("New division: {id}");
//! save_file(editor.document(), "path/to/folio.mei").unwrap();
//! ```

pub mod command;
pub mod document;
pub mod editor;
pub mod error;
pub mod model;
pub mod options;
pub mod parser;
pub mod reflow;
mod verify;
pub mod writer;
pub mod zone;

use std::path::Path;

pub use command::Command;
pub use document::{Document, Node, NodeId};
pub use editor::Editor;
pub use error::{EditError, Result};
pub use model::*;
pub use options::{EditOptions, MissingIdPolicy};
pub use parser::parse_mei;
pub use writer::write_mei;

/// Load an MEI document from a file path.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let data = std::fs::read(path.as_ref())?;
    load_bytes(&data)
}

/// Load an MEI document from raw bytes.
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    let xml = std::str::from_utf8(data)
        .map_err(|e| EditError::Parse(format!("Invalid UTF-8 in MEI file: {e}")))?;
    parse_mei(xml)
}

/// Write a document to a file path, replacing its contents.
pub fn save_file<P: AsRef<Path>>(doc: &Document, path: P) -> Result<()> {
    let xml = write_mei(doc)?;
    std::fs::write(path.as_ref(), xml)?;
    Ok(())
}

/// Serialize an operation's outcome to JSON (`null`, `{"id": …}` or
/// `{"nids": […]}`).
pub fn outcome_to_json(outcome: &EditOutcome) -> Result<String> {
    Ok(serde_json::to_string(outcome)?)
}

/// Decode a JSON command and apply it.
pub fn apply_json(editor: &mut Editor, json: &str) -> Result<String> {
    let command = Command::from_json(json)?;
    let outcome = editor.apply(&command)?;
    outcome_to_json(&outcome)
}
