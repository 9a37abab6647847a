//! Completion client.
//!
//! Sends one prompt to a chat-completions backend and returns the text of the
//! first choice. The backend is picked from the shape of the credential; all
//! routed providers speak the same OpenAI-compatible protocol.
//!
//! One request per call: no retry, no streaming. Truncated output (a
//! `length` finish reason) is passed through unmodified.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CompletionConfig;
use crate::errors::CompletionError;

/// Raw model output. Untrusted input to the patch synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub text: String,
    pub model: String,
}

/// Anything that can turn a prompt into a completion.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResult, CompletionError>;
}

/// Backends reachable through credential-prefix routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    Cerebras,
    Groq,
    OpenAi,
}

impl Provider {
    /// Route a credential to its backend. Pure function of the string.
    pub fn from_credential(api_key: &str) -> Self {
        if api_key.starts_with("sk-or-") {
            Provider::OpenRouter
        } else if api_key.starts_with("csk-") {
            Provider::Cerebras
        } else if api_key.starts_with("gsk_") {
            Provider::Groq
        } else {
            Provider::OpenAi
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Cerebras => "https://api.cerebras.ai/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenRouter => "google/gemini-2.0-flash-exp:free",
            Provider::Cerebras => "llama3.1-8b",
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::OpenAi => "gpt-4o",
        }
    }

    /// Attribution headers OpenRouter asks clients to send.
    pub fn extra_headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Provider::OpenRouter => &[
                ("HTTP-Referer", "https://github.com/cline/cline"),
                ("X-Title", "Cline Agent"),
            ],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenRouter => write!(f, "openrouter"),
            Provider::Cerebras => write!(f, "cerebras"),
            Provider::Groq => write!(f, "groq"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

// ── Wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────

/// Chat-completions client for one routed backend.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: Client,
    provider: Provider,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatCompletionClient {
    /// Build a client from config. Fails before any I/O when no credential
    /// is configured.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key.expose().trim();
        if api_key.is_empty() {
            return Err(CompletionError::MissingCredential);
        }

        let provider = Provider::from_credential(api_key);
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.base_url().to_string());
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(CompletionError::Http)?;

        Ok(Self {
            http,
            provider,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResult, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        info!(
            provider = %self.provider,
            model = %self.model,
            prompt_bytes = prompt.len(),
            "requesting completion"
        );

        let mut builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request);
        for (name, value) in self.provider.extra_headers() {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(CompletionError::RateLimited { retry_after });
        }

        if status >= 400 {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".into());
            return Err(if status == 401 || status == 403 {
                CompletionError::Unauthorized { status, message }
            } else {
                CompletionError::Api { status, message }
            });
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        let result = parse_chat_response(&body, &self.model)?;
        debug!(bytes = result.text.len(), "completion received");
        Ok(result)
    }
}

impl ChatCompletionClient {
    fn map_transport(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            CompletionError::Http(err)
        }
    }
}

/// Pull the first choice's text out of a chat-completions body.
pub fn parse_chat_response(
    body: &str,
    requested_model: &str,
) -> Result<CompletionResult, CompletionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(format!("failed to parse response: {e}")))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::InvalidResponse("response has no choices".into()))?;

    if choice.finish_reason.as_deref() == Some("length") {
        debug!("completion hit the max_tokens limit; passing truncated output through");
    }

    let text = choice
        .message
        .content
        .ok_or_else(|| CompletionError::InvalidResponse("first choice has no content".into()))?;

    Ok(CompletionResult {
        text,
        model: response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}
