//! Typed error hierarchy for the autofix pipeline.
//!
//! `FixError` is the run-level taxonomy; its Display output is prefixed with
//! the error class so a failed run's last line says what went wrong:
//! - `UsageError`: bad invocation
//! - `IOError`: repository unreadable or unwritable
//! - `TemplateError`: prompt template malformed
//! - `CompletionError`: model backend unreachable, unauthorized, or malformed
//! - `DiffToolError`: diff mechanism unavailable or failed
//!
//! `KestraError` covers the workflow orchestrator client used by the trigger
//! and log relay surfaces.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for one fix run.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("UsageError: {0}")]
    Usage(String),

    #[error("IOError: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TemplateError: {0}")]
    Template(String),

    #[error("CompletionError: {0}")]
    Completion(#[from] CompletionError),

    #[error("DiffToolError: {0}")]
    DiffTool(#[from] DiffToolError),
}

impl FixError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FixError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the language-model backend call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API credential configured (set AUTOFIX_API_KEY or OPENAI_API_KEY)")]
    MissingCredential,

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("backend rejected the credential (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("rate limited by backend (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the text differ. The "files differ" signal is not one of them.
#[derive(Debug, Error)]
pub enum DiffToolError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("diff output was not valid UTF-8 for {path}")]
    InvalidOutput { path: String },

    #[error("failed to read {path} for diffing: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the workflow orchestrator (Kestra) HTTP API.
#[derive(Debug, Error)]
pub enum KestraError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("execution {id} not found")]
    NotFound { id: String },

    #[error("orchestrator error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl KestraError {
    /// Not-found answers are expected while an execution is still being
    /// scheduled; pollers skip them silently.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KestraError::NotFound { .. })
    }
}
