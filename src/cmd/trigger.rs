//! `autofix trigger`: start the remote autofix workflow.

use anyhow::{Context, Result};
use autofix::config::AutofixConfig;
use autofix::kestra::{KestraClient, Orchestrator, TriggerRequest};
use autofix::ui::StageSpinner;

pub async fn cmd_trigger(
    config: &AutofixConfig,
    issue_url: String,
    repo_url: String,
    github_token: Option<String>,
) -> Result<()> {
    let client = KestraClient::new(&config.kestra);
    let request = TriggerRequest {
        issue_url,
        repo_url,
        github_token: github_token.unwrap_or_default(),
        api_key: config.completion.api_key.expose().to_string(),
    };

    let spinner = StageSpinner::start(format!("Triggering workflow at {}...", config.kestra.url));
    let job_id = match client.trigger_fix(&request).await {
        Ok(id) => {
            spinner.succeed("Workflow started");
            id
        }
        Err(e) => {
            spinner.fail("Trigger failed");
            return Err(e).context("Failed to trigger the autofix workflow");
        }
    };

    println!("{}", job_id);
    Ok(())
}
