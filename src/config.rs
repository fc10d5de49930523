use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080";
pub const DEFAULT_SERVICE: &str = "youtube";
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every API request is prefixed with.
    pub api_endpoint: String,
    /// Value of the `service` query parameter.
    pub service: String,
    /// Input silence required before a query is resolved.
    pub debounce_ms: u64,
    /// Request timeout; `None` leaves it to the transport.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            timeout_secs: None,
            user_agent: concat!("jaye/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from `path`, or from the per-user config file when `path` is None.
    /// A missing default file yields defaults; a missing explicit file is an error.
    /// `JAYE_*` environment variables are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        cfg.apply_env();
        cfg.normalize()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("JAYE_API_ENDPOINT") { if !v.trim().is_empty() { self.api_endpoint = v; } }
        if let Ok(v) = std::env::var("JAYE_SERVICE") { if !v.trim().is_empty() { self.service = v; } }
        self.debounce_ms = std::env::var("JAYE_DEBOUNCE_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(self.debounce_ms);
        if let Some(t) = std::env::var("JAYE_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
            self.timeout_secs = Some(t);
        }
    }

    /// Validate the endpoint and strip trailing slashes so paths can be appended verbatim.
    pub fn normalize(&mut self) -> Result<()> {
        let trimmed = self.api_endpoint.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&trimmed).with_context(|| format!("invalid api_endpoint: {trimmed}"))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("api_endpoint must be http or https (got `{other}`)")),
        }
        if self.service.trim().is_empty() {
            return Err(anyhow!("service must not be empty"));
        }
        self.api_endpoint = trimmed;
        Ok(())
    }

    pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    pub fn timeout(&self) -> Option<Duration> { self.timeout_secs.map(Duration::from_secs) }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("de", "kohlbau", "jaye").map(|p| p.config_dir().join("config.toml"))
}
