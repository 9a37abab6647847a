//! One fix attempt, end to end: load → compose → complete → synthesize → write.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::completion::CompletionBackend;
use crate::config::AutofixConfig;
use crate::errors::FixError;
use crate::patch::{self, PatchSynthesizer, SynthesisReport, WriteOutcome};
use crate::prompt;
use crate::repo::RepoLoader;

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub issue_body: String,
    pub repo_path: PathBuf,
}

/// Non-fatal terminal outcomes of a run.
#[derive(Debug)]
pub enum FixOutcome {
    PatchWritten {
        path: PathBuf,
        fragments: usize,
        report: SynthesisReport,
    },
    /// Nothing usable was proposed; the raw completion is kept for diagnosis.
    NoChanges {
        raw_completion: String,
        report: SynthesisReport,
    },
}

/// Run the pipeline against `request.repo_path`.
///
/// The caller must hold exclusive access to the repository for the
/// duration: shadow files are written next to the originals.
pub async fn run_fix(
    config: &AutofixConfig,
    request: &FixRequest,
    backend: &dyn CompletionBackend,
) -> Result<FixOutcome, FixError> {
    let root = request.repo_path.as_path();

    let loader = RepoLoader::new(&config.loader);
    let load_root = root.to_path_buf();
    let snapshot = run_blocking(root, move || loader.load(&load_root)).await?;
    info!(
        files = snapshot.len(),
        bytes = snapshot.total_bytes(),
        "loaded repository"
    );

    let template = prompt::load_template(config.prompt.template_path.as_deref())?;
    let prompt = prompt::compose(&template, &request.issue_body, &snapshot)?;

    let completion = backend.complete(&prompt).await?;
    info!(model = %completion.model, bytes = completion.text.len(), "completion received");

    let differ = patch::differ_for(config.synthesis.differ);
    let completion_text = completion.text.clone();
    let synth_root = root.to_path_buf();
    let report = run_blocking(root, move || {
        PatchSynthesizer::new(differ.as_ref()).synthesize(&completion_text, &snapshot, &synth_root)
    })
    .await?;

    for path in &report.duplicates {
        warn!(%path, "model proposed this file more than once; using the last version");
    }
    if let Some(path) = &report.unterminated {
        warn!(%path, "completion ended inside a file block; output may be truncated");
    }

    match patch::write_patch(&report.patch, root)? {
        WriteOutcome::Written(path) => Ok(FixOutcome::PatchWritten {
            path,
            fragments: report.patch.len(),
            report,
        }),
        WriteOutcome::NoChange => Ok(FixOutcome::NoChanges {
            raw_completion: completion.text,
            report,
        }),
    }
}

/// Run filesystem and subprocess work on the blocking pool.
async fn run_blocking<T, F>(root: &Path, f: F) -> Result<T, FixError>
where
    F: FnOnce() -> Result<T, FixError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(FixError::io(root, std::io::Error::other(e))),
    }
}
