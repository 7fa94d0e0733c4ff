//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a batch operation does when one of its IDs does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingIdPolicy {
    /// Fail the whole operation before anything is changed.
    #[default]
    Abort,
    /// Log and skip the unresolved IDs, applying the rest.
    Skip,
}

/// Options controlling how the editor applies operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditOptions {
    /// Policy for unresolved IDs in delete, neumify and ungroup batches.
    pub missing_ids: MissingIdPolicy,
}

impl EditOptions {
    /// Load options from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = EditOptions::from_json(r#"{"missing_ids":"skip"}"#).unwrap();
        assert_eq!(opts.missing_ids, MissingIdPolicy::Skip);

        let opts = EditOptions::from_json("{}").unwrap();
        assert_eq!(opts, EditOptions::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let opts = EditOptions::from_json(r#"{"renumber_staff_defs":false}"#).unwrap();
        assert_eq!(opts, EditOptions::default());
    }
}
