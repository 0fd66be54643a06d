//! Completion backend configuration.
//!
//! The binary fills these from environment variables; tests build them
//! directly.

use std::time::Duration;

use crate::error::RunnerError;

/// Request timeout applied to every completion call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a single completion backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The wire format spoken by the backend.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://openrouter.ai/api/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g. `openai/gpt-3.5-turbo`).
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Supported completion API formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenRouter`, `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as it appears in configuration.
    pub fn parse(name: &str) -> Result<Self, RunnerError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "openrouter" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}
