//! Unified configuration for autofix.
//!
//! Built once at the process boundary and passed by reference into every
//! component. Layering is file → environment → CLI:
//!
//! ```toml
//! [completion]
//! api_key = "sk-..."
//! max_tokens = 2000
//! timeout_secs = 120
//!
//! [loader]
//! extensions = ["rs", "js", "md"]
//! excluded_dirs = [".git", "node_modules"]
//!
//! [synthesis]
//! differ = "builtin"
//!
//! [kestra]
//! url = "http://localhost:8080"
//! namespace = "dev.autofix"
//! flow_id = "ai-issue-autofix"
//!
//! [relay]
//! poll_interval_ms = 1000
//! max_polls = 600
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the working directory when `--config` is absent.
pub const LOCAL_CONFIG_FILE: &str = "autofix.toml";

/// A secret that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "Secret(<empty>)")
        } else {
            write!(f, "Secret(<redacted>)")
        }
    }
}

/// Which differ the patch synthesizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferKind {
    /// `git diff --no-index --ignore-space-at-eol`
    #[default]
    Git,
    /// In-process line diff, no external binary.
    Builtin,
}

impl std::fmt::Display for DifferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifferKind::Git => write!(f, "git"),
            DifferKind::Builtin => write!(f, "builtin"),
        }
    }
}

impl std::str::FromStr for DifferKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(DifferKind::Git),
            "builtin" | "in-process" => Ok(DifferKind::Builtin),
            _ => anyhow::bail!("Invalid differ '{}'. Valid values: git, builtin", s),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Credential; its prefix selects the backend.
    #[serde(default)]
    pub api_key: Secret,
    /// Override the routed backend's base URL (mock servers, proxies).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Override the routed backend's default model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: None,
            model: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Repository loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File extensions (without the dot) that are read into the snapshot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names that are pruned from the walk.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    [
        "js", "ts", "md", "json", "html", "css", "txt", "jsx", "tsx", "mjs", "cjs", "rs", "py",
        "go", "java", "kt", "rb", "php", "c", "h", "cpp", "hpp", "cs", "swift", "scss", "vue",
        "svelte", "toml", "yaml", "yml", "xml", "sh", "sql",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_dirs() -> Vec<String> {
    [".git", ".hg", ".svn", "node_modules", "__pycache__", ".venv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excluded_dirs: default_excluded_dirs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub differ: DifferKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Custom template; the embedded default is used when unset.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

/// Workflow orchestrator (Kestra) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KestraConfig {
    #[serde(default = "default_kestra_url")]
    pub url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_flow_id")]
    pub flow_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Secret,
}

fn default_kestra_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_tenant() -> String {
    "main".to_string()
}

fn default_namespace() -> String {
    "dev.autofix".to_string()
}

fn default_flow_id() -> String {
    "ai-issue-autofix".to_string()
}

impl Default for KestraConfig {
    fn default() -> Self {
        Self {
            url: default_kestra_url(),
            tenant: default_tenant(),
            namespace: default_namespace(),
            flow_id: default_flow_id(),
            username: String::new(),
            password: Secret::default(),
        }
    }
}

/// Log relay polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    600
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl RelayConfig {
    /// Never zero: a zero-period ticker cannot be built.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutofixConfig {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub kestra: KestraConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AutofixConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse autofix configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        if self.relay.poll_interval_ms == 0 {
            anyhow::bail!("Invalid relay.poll_interval_ms '0': must be at least 1");
        }
        if self.relay.max_polls == 0 {
            anyhow::bail!("Invalid relay.max_polls '0': must be at least 1");
        }
        Ok(())
    }

    /// Load a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Resolve the file layer: an explicit path must exist; otherwise the
    /// local file, then the user config dir, then defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = cwd.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(&local);
        }

        if let Some(global) = global_config_path() {
            if global.is_file() {
                return Self::from_file(&global);
            }
        }

        Ok(Self::default())
    }

    /// Apply environment overrides from any key/value source.
    ///
    /// `main` passes `std::env::var`; tests pass a closure over a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("AUTOFIX_API_KEY")
            .or_else(|| non_empty("OPENAI_API_KEY"))
            .or_else(|| non_empty("API_KEY"))
        {
            self.completion.api_key = Secret::new(key.trim());
        }
        if let Some(url) = non_empty("AUTOFIX_API_BASE_URL") {
            self.completion.base_url = Some(url);
        }
        if let Some(model) = non_empty("AUTOFIX_MODEL") {
            self.completion.model = Some(model);
        }
        if let Some(url) = non_empty("KESTRA_URL") {
            self.kestra.url = url;
        }
        if let Some(user) = non_empty("KESTRA_EMAIL") {
            self.kestra.username = user;
        }
        if let Some(pass) = non_empty("KESTRA_PASSWORD") {
            self.kestra.password = Secret::new(pass);
        }
    }

    /// Full boundary load: file layer, then the process environment.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let mut config = Self::discover(explicit, cwd)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }
}

/// `<config dir>/autofix/config.toml`, if the platform has a config dir.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("autofix").join("config.toml"))
}
