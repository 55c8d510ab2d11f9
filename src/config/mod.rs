// slackflow — Configuration
// License: Apache-2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("home directory not found")]
    NoHomeDir,
    #[error("no Slack token configured")]
    MissingToken,
    #[error("invalid api_base {0:?}: {1}")]
    InvalidApiBase(String, String),
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Whole-request timeout. Unset means the caller decides when to give up.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub proxy: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            proxy: String::new(),
        }
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &self.masked_token())
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("proxy", &self.proxy)
            .finish()
    }
}

fn default_api_base() -> String {
    crate::slack::DEFAULT_API_BASE.to_string()
}
fn default_connect_timeout_secs() -> u64 {
    30
}

impl SlackConfig {
    /// Token with everything but the prefix and last four characters hidden.
    /// Tokens too short to hide at least four characters are masked entirely.
    pub fn masked_token(&self) -> String {
        let t = &self.token;
        if t.is_empty() {
            return "(not set)".to_string();
        }
        let chars: Vec<char> = t.chars().collect();
        if chars.len() <= 12 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..5].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (prefix: SLACKFLOW_)
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SLACKFLOW_SLACK_TOKEN") {
            self.slack.token = v;
        }
        if let Ok(v) = std::env::var("SLACKFLOW_SLACK_API_BASE") {
            self.slack.api_base = v;
        }
        if let Ok(v) = std::env::var("SLACKFLOW_SLACK_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.slack.timeout_secs = Some(n);
            }
        }
        if let Ok(v) = std::env::var("SLACKFLOW_SLACK_PROXY") {
            self.slack.proxy = v;
        }
    }

    /// Get the default config file path: ~/.slackflow/config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".slackflow").join("config.json"))
    }

    /// Validate configuration for basic correctness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        url::Url::parse(&self.slack.api_base)
            .map_err(|e| ConfigError::InvalidApiBase(self.slack.api_base.clone(), e.to_string()))?;

        if !self.slack.token.starts_with("xox") {
            tracing::warn!("Slack token does not look like a bot or user token");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
