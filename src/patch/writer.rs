//! Persisting the aggregated patch.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use super::synthesizer::AggregatedPatch;
use crate::errors::FixError;

/// Name of the patch file written into the repository root.
pub const PATCH_FILE_NAME: &str = "patch.diff";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    NoChange,
}

/// Write `patch` to `<repo_root>/patch.diff`.
///
/// An empty patch writes nothing and leaves any existing file alone. The
/// file is staged next to its destination and renamed into place, so a
/// reader never sees a partial patch.
pub fn write_patch(patch: &AggregatedPatch, repo_root: &Path) -> Result<WriteOutcome, FixError> {
    if patch.is_empty() {
        info!("no changes detected, patch file not written");
        return Ok(WriteOutcome::NoChange);
    }

    let dest = repo_root.join(PATCH_FILE_NAME);
    let mut staged = NamedTempFile::new_in(repo_root).map_err(|e| FixError::io(repo_root, e))?;
    staged
        .write_all(patch.render().as_bytes())
        .and_then(|_| staged.flush())
        .map_err(|e| FixError::io(staged.path(), e))?;
    staged
        .persist(&dest)
        .map_err(|e| FixError::io(&dest, e.error))?;

    info!(path = %dest.display(), fragments = patch.len(), "patch written");
    Ok(WriteOutcome::Written(dest))
}
