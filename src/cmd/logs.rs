//! `autofix logs`: follow an execution's log lines in the terminal.

use std::sync::Arc;

use anyhow::{Result, bail};
use autofix::config::AutofixConfig;
use autofix::kestra::KestraClient;
use autofix::relay::{LogRelay, RelayEnd};
use autofix::ui::{format_relay_event, print_relay_start};
use tokio::sync::mpsc;

pub async fn cmd_logs(config: &AutofixConfig, job_id: String) -> Result<()> {
    let relay = LogRelay::new(Arc::new(KestraClient::new(&config.kestra)), &config.relay);
    let (tx, mut rx) = mpsc::channel(64);

    print_relay_start(&job_id);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", format_relay_event(&event));
        }
    });

    let end = relay.run(&job_id, tx).await;
    printer.await?;

    match end {
        RelayEnd::Finished(state) if state == "SUCCESS" => Ok(()),
        RelayEnd::Finished(state) => bail!("Execution {} ended in state {}", job_id, state),
        RelayEnd::PollLimit => bail!(
            "Gave up on execution {} after {} polls",
            job_id,
            config.relay.max_polls
        ),
        RelayEnd::Disconnected => Ok(()),
    }
}
