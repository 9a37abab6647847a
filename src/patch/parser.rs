//! File-block extraction from model output.
//!
//! A line-oriented state machine over three states:
//!
//! - `Outside`: looking for a `File: <path>` marker line
//! - `ReadingPath`: marker seen, waiting for the opening fence
//! - `InsideBlock`: collecting content until the closing fence
//!
//! Rules:
//! - the marker is matched after trimming leading whitespace; an empty path
//!   is not a marker
//! - blank lines may sit between marker and opening fence; any other line
//!   drops the pending path (another marker line replaces it)
//! - the opening fence is "```" plus an optional language tag, surrounding
//!   whitespace ignored
//! - inside a block, a tagged fence opens a nested fence and stays content;
//!   a bare "```" closes the innermost fence, ending the block at depth zero
//! - content is the exact text between the fence lines, line endings kept
//! - a block still open at end of input is dropped

use tracing::{debug, warn};

const PATH_LABEL: &str = "File:";
const FENCE: &str = "```";

/// One proposed file replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedChange {
    pub path: String,
    pub new_content: String,
}

/// Parser output: changes in first-seen order with last-write-wins content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedChanges {
    pub changes: Vec<ProposedChange>,
    /// Paths that appeared more than once; the later content won.
    pub duplicates: Vec<String>,
    /// Blocks opened but never closed (typically truncated output).
    pub unterminated: Option<String>,
}

impl ParsedChanges {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn insert(&mut self, path: String, new_content: String) {
        match self.changes.iter_mut().find(|c| c.path == path) {
            Some(existing) => {
                debug!(%path, "duplicate file block, later content wins");
                existing.new_content = new_content;
                if !self.duplicates.contains(&path) {
                    self.duplicates.push(path);
                }
            }
            None => self.changes.push(ProposedChange { path, new_content }),
        }
    }
}

enum State {
    Outside,
    ReadingPath { path: String },
    InsideBlock {
        path: String,
        content: String,
        depth: usize,
    },
}

/// Parse every `File:` + fenced block pair out of `text`.
pub fn parse_file_blocks(text: &str) -> ParsedChanges {
    let mut parsed = ParsedChanges::default();
    let mut state = State::Outside;

    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(['\n', '\r']);

        state = match state {
            State::Outside => match path_marker(line) {
                Some(path) => State::ReadingPath { path },
                None => State::Outside,
            },
            State::ReadingPath { path } => {
                if is_opening_fence(line.trim()) {
                    State::InsideBlock {
                        path,
                        content: String::new(),
                        depth: 0,
                    }
                } else if let Some(next) = path_marker(line) {
                    State::ReadingPath { path: next }
                } else if line.trim().is_empty() {
                    State::ReadingPath { path }
                } else {
                    State::Outside
                }
            }
            State::InsideBlock {
                path,
                mut content,
                depth,
            } => {
                let fence = line.trim();
                if fence == FENCE {
                    if depth == 0 {
                        parsed.insert(path, content);
                        State::Outside
                    } else {
                        content.push_str(raw_line);
                        State::InsideBlock {
                            path,
                            content,
                            depth: depth - 1,
                        }
                    }
                } else if is_opening_fence(fence) {
                    content.push_str(raw_line);
                    State::InsideBlock {
                        path,
                        content,
                        depth: depth + 1,
                    }
                } else {
                    content.push_str(raw_line);
                    State::InsideBlock {
                        path,
                        content,
                        depth,
                    }
                }
            }
        };
    }

    if let State::InsideBlock { path, .. } = state {
        warn!(%path, "file block never closed; dropping it");
        parsed.unterminated = Some(path);
    }

    parsed
}

fn path_marker(line: &str) -> Option<String> {
    let path = line.trim_start().strip_prefix(PATH_LABEL)?.trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

fn is_opening_fence(line: &str) -> bool {
    line.strip_prefix(FENCE).is_some_and(|tag| {
        tag.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '#' | '-'))
    })
}
