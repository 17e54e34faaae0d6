//! Notepad patch operations.

use serde::{Deserialize, Serialize};

/// One structured edit extracted from a persona's response.
///
/// Line numbers are 1-based and signed so that whatever the model wrote
/// survives parsing; out-of-range values are resolved when applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PatchOperation {
    /// Replace the whole document.
    ReplaceAll { content: String },
    /// Add content after the last line.
    Append { content: String },
    /// Add content before the first line.
    Prepend { content: String },
    /// Insert a new line after `line` (0 inserts at the top).
    InsertAfterLine { line: i64, content: String },
    /// Overwrite line `line`.
    ReplaceLine { line: i64, content: String },
    /// Remove line `line`.
    DeleteLine { line: i64 },
    /// Replace a literal substring, first occurrence or every occurrence.
    SearchReplace { find: String, with: String, all: bool },
}

impl PatchOperation {
    /// Wire tag name of this operation (without the `np-` prefix).
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::ReplaceAll { .. } => "replace-all",
            Self::Append { .. } => "append",
            Self::Prepend { .. } => "prepend",
            Self::InsertAfterLine { .. } => "insert",
            Self::ReplaceLine { .. } => "replace",
            Self::DeleteLine { .. } => "delete",
            Self::SearchReplace { .. } => "search-replace",
        }
    }
}
