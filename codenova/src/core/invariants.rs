//! Session invariants checked after load and in tests.

use std::collections::HashSet;

use crate::core::session::Session;
use crate::core::types::File;

/// Check the invariants every reachable session must satisfy:
/// - At least one file
/// - No duplicate file ids
/// - `active_file_id` names an existing file
pub fn validate_invariants(session: &Session) -> Vec<String> {
    let mut errors = validate_files(&session.files);
    if !session.files.is_empty() && session.file(&session.active_file_id).is_none() {
        errors.push(format!(
            "active file '{}' is not an open file",
            session.active_file_id
        ));
    }
    errors
}

/// Invariants on a bare file collection, as read back from storage.
pub fn validate_files(files: &[File]) -> Vec<String> {
    let mut errors = Vec::new();
    if files.is_empty() {
        errors.push("session must contain at least one file".to_string());
    }
    let mut seen = HashSet::new();
    for (index, file) in files.iter().enumerate() {
        if !seen.insert(file.id.as_str()) {
            errors.push(format!("duplicate file id '{}' at index {}", file.id, index));
        }
    }
    errors
}
