//! Prompt composition.
//!
//! A template carries two markers, one for the issue text and one for the
//! serialized codebase. Each is replaced once, literally, issue first. Marker
//! text inside the issue body is not escaped: an issue that contains the
//! codebase marker has that occurrence replaced instead of the template's.

use std::path::Path;

use crate::errors::FixError;
use crate::repo::CodebaseSnapshot;

/// Marker replaced with the issue description.
pub const ISSUE_MARKER: &str = "{{ISSUE_BODY}}";

/// Marker replaced with the serialized codebase.
pub const CODEBASE_MARKER: &str = "{{CODEBASE}}";

/// Separator between files in the serialized codebase.
pub const FILE_SEPARATOR: &str = "\n---\n";

/// Template shipped with the binary.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../prompts/fix_prompt.txt");

/// Load a template from disk, or the embedded default when `path` is `None`.
pub fn load_template(path: Option<&Path>) -> Result<String, FixError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| FixError::io(path, e)),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Serialize the snapshot: a `File:` header and content per file.
pub fn render_codebase(snapshot: &CodebaseSnapshot) -> String {
    snapshot
        .files()
        .iter()
        .map(|f| format!("File: {}\nContent:\n{}\n", f.path, f.content))
        .collect::<Vec<_>>()
        .join(FILE_SEPARATOR)
}

/// Merge template, issue and codebase into one prompt.
pub fn compose(
    template: &str,
    issue_body: &str,
    snapshot: &CodebaseSnapshot,
) -> Result<String, FixError> {
    for marker in [ISSUE_MARKER, CODEBASE_MARKER] {
        if !template.contains(marker) {
            return Err(FixError::Template(format!(
                "template is missing the {} marker",
                marker
            )));
        }
    }

    let codebase = render_codebase(snapshot);
    Ok(template
        .replacen(ISSUE_MARKER, issue_body, 1)
        .replacen(CODEBASE_MARKER, &codebase, 1))
}
