//! Workflow orchestrator (Kestra) client.
//!
//! Three calls are used: trigger an execution of the autofix flow, read an
//! execution's current state, and read its log lines. The [`Orchestrator`]
//! trait is the seam the server and the log relay depend on.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::KestraConfig;
use crate::errors::KestraError;

/// Execution states after which no more logs will arrive.
pub const TERMINAL_STATES: &[&str] = &["SUCCESS", "FAILED", "WARNING", "KILLED", "CANCELLED"];

pub fn is_terminal(state: &str) -> bool {
    TERMINAL_STATES.contains(&state)
}

/// Inputs forwarded to the autofix flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRequest {
    pub issue_url: String,
    pub repo_url: String,
    pub github_token: String,
    pub api_key: String,
}

/// One log line as the orchestrator reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecutionCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionStatus {
    state: ExecutionState,
}

#[derive(Debug, Deserialize)]
struct ExecutionState {
    current: String,
}

/// Orchestrator operations used by the CLI, server and relay.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start an execution and return its id.
    async fn trigger_fix(&self, request: &TriggerRequest) -> Result<String, KestraError>;

    /// Current state name of an execution, e.g. `RUNNING` or `SUCCESS`.
    async fn execution_state(&self, execution_id: &str) -> Result<String, KestraError>;

    /// Every log line of an execution so far, oldest first.
    async fn logs(&self, execution_id: &str) -> Result<Vec<LogEntry>, KestraError>;
}

/// HTTP client for the Kestra API.
#[derive(Debug, Clone)]
pub struct KestraClient {
    http: Client,
    config: KestraConfig,
}

impl KestraClient {
    pub fn new(config: &KestraConfig) -> Self {
        Self {
            http: Client::new(),
            config: config.clone(),
        }
    }

    fn api_base(&self) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.tenant
        )
    }

    pub fn trigger_url(&self) -> String {
        format!(
            "{}/executions/{}/{}",
            self.api_base(),
            self.config.namespace,
            self.config.flow_id
        )
    }

    pub fn execution_url(&self, execution_id: &str) -> String {
        format!("{}/executions/{}", self.api_base(), execution_id)
    }

    pub fn logs_url(&self, execution_id: &str) -> String {
        format!("{}/logs/{}", self.api_base(), execution_id)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.config.username.is_empty() && self.config.password.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.config.username, Some(self.config.password.expose()))
        }
    }

    async fn check(
        response: reqwest::Response,
        execution_id: &str,
    ) -> Result<reqwest::Response, KestraError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(KestraError::NotFound {
                id: execution_id.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KestraError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Orchestrator for KestraClient {
    async fn trigger_fix(&self, request: &TriggerRequest) -> Result<String, KestraError> {
        let schedule_date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let form = Form::new()
            .text("issue_url", request.issue_url.clone())
            .text("repo_url", request.repo_url.clone())
            .text("github_token", request.github_token.clone())
            .text("api_key", request.api_key.clone())
            .text("apply_fix", "true")
            .text("create_pr", "true");

        let url = self.trigger_url();
        info!(%url, "triggering autofix workflow");
        let response = self
            .authorized(self.http.post(&url))
            .query(&[("scheduleDate", schedule_date.as_str())])
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response, &self.config.flow_id).await?;

        let body = response.text().await?;
        let created: ExecutionCreated = serde_json::from_str(&body)
            .map_err(|e| KestraError::InvalidResponse(format!("{}: {}", e, body)))?;
        info!(execution_id = %created.id, "workflow started");
        Ok(created.id)
    }

    async fn execution_state(&self, execution_id: &str) -> Result<String, KestraError> {
        let response = self
            .authorized(self.http.get(self.execution_url(execution_id)))
            .send()
            .await?;
        let response = Self::check(response, execution_id).await?;
        let status: ExecutionStatus = response
            .json()
            .await
            .map_err(|e| KestraError::InvalidResponse(e.to_string()))?;
        debug!(%execution_id, state = %status.state.current, "execution state");
        Ok(status.state.current)
    }

    async fn logs(&self, execution_id: &str) -> Result<Vec<LogEntry>, KestraError> {
        let response = self
            .authorized(self.http.get(self.logs_url(execution_id)))
            .send()
            .await?;
        let response = Self::check(response, execution_id).await?;
        let logs: Option<Vec<LogEntry>> = response
            .json()
            .await
            .map_err(|e| KestraError::InvalidResponse(e.to_string()))?;
        Ok(logs.unwrap_or_default())
    }
}
