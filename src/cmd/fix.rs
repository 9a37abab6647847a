//! `autofix fix`: one pass of the patch pipeline against a local checkout.

use anyhow::Result;
use autofix::completion::ChatCompletionClient;
use autofix::config::{AutofixConfig, DifferKind};
use autofix::errors::FixError;
use autofix::pipeline::{FixRequest, run_fix};
use autofix::ui::{StageSpinner, print_fix_outcome};
use std::path::PathBuf;

pub async fn cmd_fix(
    config: &AutofixConfig,
    issue_body: String,
    repo_path: PathBuf,
    differ: Option<DifferKind>,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(differ) = differ {
        config.synthesis.differ = differ;
    }

    let client = ChatCompletionClient::from_config(&config.completion).map_err(FixError::from)?;
    let spinner = StageSpinner::start(format!(
        "Asking {} ({}) for a fix...",
        client.provider(),
        client.model()
    ));

    let request = FixRequest {
        issue_body,
        repo_path,
    };
    match run_fix(&config, &request, &client).await {
        Ok(outcome) => {
            spinner.clear();
            print_fix_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            spinner.fail("Fix run failed");
            Err(e.into())
        }
    }
}
