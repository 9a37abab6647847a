use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::{RelayConfig, Secret};
use crate::errors::KestraError;
use crate::kestra::{Orchestrator, TriggerRequest};
use crate::relay::{LogRelay, RelayEvent};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub orchestrator: Arc<dyn Orchestrator>,
    pub relay: RelayConfig,
    /// Used when a fix request carries no model key of its own.
    pub default_api_key: Secret,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequestBody {
    #[serde(default)]
    pub issue_url: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub github_token: String,
    #[serde(default)]
    pub openai_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixStarted {
    pub job_id: String,
    pub status: String,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    /// The orchestrator answered with an error status; it is passed through.
    Upstream { status: u16, details: String },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": msg}))).into_response()
            }
            ApiError::Upstream { status, details } => {
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    code,
                    Json(serde_json::json!({
                        "error": format!("Kestra error: {}", status),
                        "details": details,
                    })),
                )
                    .into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": msg})),
            )
                .into_response(),
        }
    }
}

impl From<KestraError> for ApiError {
    fn from(err: KestraError) -> Self {
        match err {
            KestraError::Api { status, body } => ApiError::Upstream {
                status,
                details: body,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/fix", post(start_fix))
        .route("/api/fix/{job_id}/logs", get(stream_logs))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn start_fix(
    State(state): State<SharedState>,
    Json(body): Json<FixRequestBody>,
) -> Result<Json<FixStarted>, ApiError> {
    if body.issue_url.trim().is_empty() || body.repo_url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "issueUrl and repoUrl are required".into(),
        ));
    }

    let api_key = body
        .openai_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| state.default_api_key.expose().to_string());

    let request = TriggerRequest {
        issue_url: body.issue_url,
        repo_url: body.repo_url,
        github_token: body.github_token,
        api_key,
    };

    let job_id = state.orchestrator.trigger_fix(&request).await.map_err(|e| {
        error!(error = %e, "failed to trigger workflow");
        ApiError::from(e)
    })?;

    Ok(Json(FixStarted {
        job_id,
        status: "started".into(),
    }))
}

async fn stream_logs(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<RelayEvent>(64);
    let relay = LogRelay::new(state.orchestrator.clone(), &state.relay);

    // Dropping the response stream closes `rx`, which stops the relay.
    tokio::spawn(async move {
        let end = relay.run(&job_id, tx).await;
        debug!(%job_id, ?end, "log relay ended");
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse(&event)), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse(event: &RelayEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(error = %e, "failed to encode relay event");
            Event::default().comment("unencodable event")
        }
    }
}
