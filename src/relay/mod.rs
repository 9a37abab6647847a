//! Log relay: polls an execution and forwards new log lines as events.
//!
//! Each poll reads the execution state and its full log list, forwards the
//! entries past the last forwarded index, and stops on a terminal state, on
//! the poll cap, or when the receiver goes away. Not-found answers are
//! normal while an execution is being scheduled and are skipped quietly;
//! other poll errors are logged and polling continues.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::kestra::{LogEntry, Orchestrator, is_terminal};

pub const FINISHED_MESSAGE: &str = "Workflow finished";

/// Payload of one relayed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Log {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Finished {
        status: String,
        message: String,
    },
}

impl RelayEvent {
    fn from_entry(entry: LogEntry) -> Self {
        RelayEvent::Log {
            timestamp: entry.timestamp,
            level: entry
                .level
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            message: entry.message,
        }
    }

    fn finished(status: &str) -> Self {
        RelayEvent::Finished {
            status: status.to_string(),
            message: FINISHED_MESSAGE.to_string(),
        }
    }
}

/// Why a relay stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    Finished(String),
    PollLimit,
    Disconnected,
}

pub struct LogRelay {
    orchestrator: Arc<dyn Orchestrator>,
    config: RelayConfig,
}

impl LogRelay {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, config: &RelayConfig) -> Self {
        Self {
            orchestrator,
            config: config.clone(),
        }
    }

    /// Poll `execution_id` until it ends, sending events to `tx`.
    pub async fn run(&self, execution_id: &str, tx: mpsc::Sender<RelayEvent>) -> RelayEnd {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut forwarded = 0usize;

        for poll in 1..=self.config.max_polls {
            tokio::select! {
                biased;
                _ = tx.closed() => {
                    debug!(%execution_id, "relay receiver closed");
                    return RelayEnd::Disconnected;
                }
                _ = ticker.tick() => {}
            }

            match self.poll_once(execution_id, &mut forwarded, &tx).await {
                Ok(Some(end)) => return end,
                Ok(None) => {}
                Err(e) if e.is_not_found() => debug!(%execution_id, poll, "execution not found yet"),
                Err(e) => warn!(%execution_id, poll, error = %e, "log polling error"),
            }
        }

        info!(%execution_id, max_polls = self.config.max_polls, "poll limit reached, closing relay");
        RelayEnd::PollLimit
    }

    async fn poll_once(
        &self,
        execution_id: &str,
        forwarded: &mut usize,
        tx: &mpsc::Sender<RelayEvent>,
    ) -> Result<Option<RelayEnd>, crate::errors::KestraError> {
        let state = self.orchestrator.execution_state(execution_id).await?;
        let logs = self.orchestrator.logs(execution_id).await?;

        if logs.len() > *forwarded {
            let fresh = logs.len() - *forwarded;
            for entry in logs.into_iter().skip(*forwarded) {
                if tx.send(RelayEvent::from_entry(entry)).await.is_err() {
                    return Ok(Some(RelayEnd::Disconnected));
                }
            }
            *forwarded += fresh;
        }

        if is_terminal(&state) {
            info!(%execution_id, %state, "execution finished");
            if tx.send(RelayEvent::finished(&state)).await.is_err() {
                return Ok(Some(RelayEnd::Disconnected));
            }
            return Ok(Some(RelayEnd::Finished(state)));
        }
        Ok(None)
    }
}
