//! Text differs.
//!
//! Both implementations compare `<path>` against its shadow `<path>.new`,
//! ignore whitespace at line ends only, and produce git-shaped unified diff
//! text whose `b/` side names the shadow file. `Ok(None)` means no
//! difference. The header is fixed up afterwards by the synthesizer.

use std::path::Path;
use std::process::Command;

use similar::{Algorithm, DiffOp, DiffTag};
use tracing::debug;

use crate::errors::DiffToolError;

/// Lines of context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Computes a unified diff between a file and its shadow.
///
/// Paths are relative to `repo_root`, which is also the working directory
/// for external tools, so headers carry repository-relative names.
pub trait TextDiffer: Send + Sync {
    fn diff(
        &self,
        repo_root: &Path,
        original: &str,
        shadow: &str,
    ) -> Result<Option<String>, DiffToolError>;
}

// ── git ───────────────────────────────────────────────────────────────

/// Wraps `git diff --no-index --ignore-space-at-eol`.
#[derive(Debug, Clone)]
pub struct GitDiffer {
    program: String,
}

impl Default for GitDiffer {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitDiffer {
    /// Use a specific git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TextDiffer for GitDiffer {
    fn diff(
        &self,
        repo_root: &Path,
        original: &str,
        shadow: &str,
    ) -> Result<Option<String>, DiffToolError> {
        // Pin the output shape regardless of user git config.
        let output = Command::new(&self.program)
            .args(["-c", "core.quotePath=false"])
            .args([
                "diff",
                "--no-index",
                "--ignore-space-at-eol",
                "--no-color",
                "--no-ext-diff",
                "--src-prefix=a/",
                "--dst-prefix=b/",
                "--",
                original,
                shadow,
            ])
            .current_dir(repo_root)
            .output()
            .map_err(|source| DiffToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match output.status.code() {
            Some(0) => Ok(None),
            // 1 is "files differ", the expected case. git also exits 1 when
            // it cannot access a path, with nothing on stdout.
            Some(1) if output.stdout.is_empty() && !output.stderr.is_empty() => {
                Err(DiffToolError::Failed {
                    program: self.program.clone(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
            Some(1) => {
                let text = String::from_utf8(output.stdout).map_err(|_| {
                    DiffToolError::InvalidOutput {
                        path: original.to_string(),
                    }
                })?;
                debug!(path = original, bytes = text.len(), "git reported a difference");
                Ok(if text.trim().is_empty() { None } else { Some(text) })
            }
            _ => Err(DiffToolError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

// ── in-process ────────────────────────────────────────────────────────

/// Line diff computed with `similar`; no external binary involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDiffer;

impl TextDiffer for BuiltinDiffer {
    fn diff(
        &self,
        repo_root: &Path,
        original: &str,
        shadow: &str,
    ) -> Result<Option<String>, DiffToolError> {
        let old = read(repo_root, original)?;
        let new = read(repo_root, shadow)?;
        Ok(unified_diff(&old, &new, original, shadow))
    }
}

fn read(repo_root: &Path, rel: &str) -> Result<String, DiffToolError> {
    let path = repo_root.join(rel);
    std::fs::read_to_string(&path).map_err(|source| DiffToolError::Read { path, source })
}

/// Render a git-style unified diff of `old` → `new`, comparing lines with
/// trailing whitespace ignored. Context lines are taken from `old`.
pub fn unified_diff(old: &str, new: &str, old_name: &str, new_name: &str) -> Option<String> {
    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();
    let old_keys: Vec<&str> = old_lines.iter().map(|l| l.trim_end()).collect();
    let new_keys: Vec<&str> = new_lines.iter().map(|l| l.trim_end()).collect();

    let ops = similar::capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys);
    if ops.iter().all(|op| op.tag() == DiffTag::Equal) {
        return None;
    }

    let mut out = format!(
        "diff --git a/{old_name} b/{new_name}\n--- a/{old_name}\n+++ b/{new_name}\n"
    );

    for group in similar::group_diff_ops(ops, CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            hunk_range(old_range.start, old_range.len()),
            hunk_range(new_range.start, new_range.len())
        ));

        for op in &group {
            render_op(&mut out, op, &old_lines, &new_lines);
        }
    }

    Some(out)
}

fn render_op(out: &mut String, op: &DiffOp, old_lines: &[&str], new_lines: &[&str]) {
    let (tag, old_range, new_range) = op.as_tag_tuple();
    match tag {
        DiffTag::Equal => {
            for line in &old_lines[old_range] {
                push_line(out, ' ', line);
            }
        }
        DiffTag::Delete => {
            for line in &old_lines[old_range] {
                push_line(out, '-', line);
            }
        }
        DiffTag::Insert => {
            for line in &new_lines[new_range] {
                push_line(out, '+', line);
            }
        }
        DiffTag::Replace => {
            for line in &old_lines[old_range] {
                push_line(out, '-', line);
            }
            for line in &new_lines[new_range] {
                push_line(out, '+', line);
            }
        }
    }
}

fn push_line(out: &mut String, prefix: char, line: &str) {
    out.push(prefix);
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push_str("\n\\ No newline at end of file\n");
    }
}

/// `start,len` in unified-diff notation (1-based; `,1` omitted like git).
fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
