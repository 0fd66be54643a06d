//! Bot configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use lifegame_chat::ServerConfig;
use lifegame_runner::{BackendType, LlmBackendConfig};

/// Errors that can occur while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// The offending variable.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Complete bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Completion backend.
    pub backend: LlmBackendConfig,
    /// Directory holding one JSON file per player.
    pub players_dir: PathBuf,
    /// Directory holding prompt templates.
    pub templates_dir: PathBuf,
    /// Chat API listen address.
    pub server: ServerConfig,
}

impl BotConfig {
    /// Load configuration from the process environment.
    ///
    /// Required: `LLM_API_KEY`.
    ///
    /// Optional:
    /// - `LLM_BACKEND` -- `openai`, `openrouter`, `deepseek`, `ollama`, `anthropic` (default `openai`)
    /// - `LLM_API_URL` -- base API URL (default `https://openrouter.ai/api/v1`)
    /// - `LLM_MODEL` -- model id (default `openai/gpt-3.5-turbo`)
    /// - `LLM_TIMEOUT_SECS` -- per-request timeout (default 30)
    /// - `PLAYERS_DIR` -- player files (default `users`)
    /// - `TEMPLATES_DIR` -- prompt templates (default `templates`)
    /// - `CHAT_HOST`, `CHAT_PORT` -- listen address (default `0.0.0.0:8080`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit map of variables.
    #[cfg(test)]
    pub fn from_map(vars: &std::collections::HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let backend_type = BackendType::parse(&or_default("LLM_BACKEND", "openai")).map_err(|e| {
            ConfigError::Invalid {
                key: "LLM_BACKEND",
                reason: e.to_string(),
            }
        })?;
        let api_key = lookup("LLM_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("LLM_API_KEY"))?;
        let timeout_secs: u64 = or_default("LLM_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: "LLM_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?;
        let port: u16 = or_default("CHAT_PORT", "8080")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: "CHAT_PORT",
                reason: format!("{e}"),
            })?;

        Ok(Self {
            backend: LlmBackendConfig {
                backend_type,
                api_url: or_default("LLM_API_URL", "https://openrouter.ai/api/v1"),
                api_key,
                model: or_default("LLM_MODEL", "openai/gpt-3.5-turbo"),
                timeout: Duration::from_secs(timeout_secs),
            },
            players_dir: PathBuf::from(or_default("PLAYERS_DIR", "users")),
            templates_dir: PathBuf::from(or_default("TEMPLATES_DIR", "templates")),
            server: ServerConfig {
                host: or_default("CHAT_HOST", "0.0.0.0"),
                port,
            },
        })
    }
}
