//! Completion client abstraction and implementations.
//!
//! Everything above this module talks to the model through the
//! [`Completion`] trait, which never fails: transport errors, non-2xx
//! statuses and unparsable bodies all come back as text starting with
//! [`ERROR_MARKER`]. Downstream parsers check for that prefix and skip tag
//! extraction when they see it.
//!
//! [`LlmBackend`] is the HTTP implementation, dispatching over the two
//! supported wire formats. [`ScriptedCompletion`] replays canned replies
//! for tests and local runs without an API key.

use std::collections::VecDeque;
use std::future::Future;

use lifegame_types::{ChatTurn, Role};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;

/// Prefix of every client-side error string returned by a [`Completion`].
pub const ERROR_MARKER: &str = "Error:";

/// Maximum tokens requested from backends that require an explicit limit.
const MAX_TOKENS: u32 = 1024;

/// A text-completion service.
///
/// Implementations must not fail: any problem is reported as a string
/// prefixed with [`ERROR_MARKER`].
pub trait Completion: Send + Sync {
    /// Send an ordered list of role-tagged messages and return the reply text.
    fn complete(&self, messages: &[ChatTurn]) -> impl Future<Output = String> + Send;
}

/// Render a client-side failure as a marked error string.
pub fn error_text(detail: &str) -> String {
    format!("{ERROR_MARKER} {detail}")
}

/// Whether a completion result is a client-side error string.
///
/// The marker is always the first thing in such a string, so prose that
/// merely mentions an error still counts as a reply.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}

// ---------------------------------------------------------------------------
// HTTP backends
// ---------------------------------------------------------------------------

/// A completion backend reached over HTTP.
///
/// Uses enum dispatch over the wire formats.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
}

/// Connection details shared by both wire formats.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpBackend {
    /// Build a client with the configured request timeout.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RunnerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

impl LlmBackend {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The model every request is sent to.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(http) | Self::Anthropic(http) => &http.model,
        }
    }

    /// Send the messages and return the reply text, or a typed error.
    pub async fn try_complete(&self, messages: &[ChatTurn]) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(http) => complete_openai(http, messages).await,
            Self::Anthropic(http) => complete_anthropic(http, messages).await,
        }
    }
}

impl Completion for LlmBackend {
    async fn complete(&self, messages: &[ChatTurn]) -> String {
        debug!(
            backend = self.name(),
            model = self.model(),
            messages = messages.len(),
            "sending completion request"
        );
        match self.try_complete(messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!(backend = self.name(), error = %e, "completion request failed");
                error_text(&e.to_string())
            }
        }
    }
}

/// Post a JSON body and return the decoded JSON response.
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, RunnerError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("connection failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(RunnerError::LlmBackend(format!(
            "API returned {status}: {error_body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("invalid API response: {e}")))
}

async fn complete_openai(http: &HttpBackend, messages: &[ChatTurn]) -> Result<String, RunnerError> {
    let url = format!("{}/chat/completions", http.api_url);
    let body = openai_body(&http.model, messages);
    let request = http
        .client
        .post(&url)
        .header("Authorization", format!("Bearer {}", http.api_key));
    let json = post_json(request, &body).await?;
    extract_openai_content(&json)
}

async fn complete_anthropic(
    http: &HttpBackend,
    messages: &[ChatTurn],
) -> Result<String, RunnerError> {
    let url = format!("{}/messages", http.api_url);
    let body = anthropic_body(&http.model, messages);
    let request = http
        .client
        .post(&url)
        .header("x-api-key", &http.api_key)
        .header("anthropic-version", "2023-06-01");
    let json = post_json(request, &body).await?;
    extract_anthropic_content(&json)
}

/// Request body for an OpenAI-compatible endpoint: messages pass through as-is.
fn openai_body(model: &str, messages: &[ChatTurn]) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": messages,
    })
}

/// Request body for the Anthropic Messages API.
///
/// System turns are hoisted into the top-level `system` field.
fn anthropic_body(model: &str, messages: &[ChatTurn]) -> serde_json::Value {
    let system = messages
        .iter()
        .filter(|turn| turn.role == Role::System)
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let conversation: Vec<&ChatTurn> = messages
        .iter()
        .filter(|turn| turn.role != Role::System)
        .collect();

    let mut body = serde_json::json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": conversation,
    });
    if !system.is_empty()
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("system".to_owned(), serde_json::Value::String(system));
    }
    body
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend(
                "invalid API response: missing choices[0].message.content".to_owned(),
            )
        })
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("invalid API response: missing content[0].text".to_owned())
        })
}

/// Create an HTTP backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> Result<LlmBackend, RunnerError> {
    let http = HttpBackend::new(config)?;
    Ok(match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(http),
        BackendType::Anthropic => LlmBackend::Anthropic(http),
    })
}

// ---------------------------------------------------------------------------
// Scripted stub
// ---------------------------------------------------------------------------

/// A completion source that replays canned replies in order.
///
/// Every request is recorded so callers can inspect the prompts that were
/// sent. Once the script runs out, each further call returns a marked
/// error string.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedCompletion {
    /// A stub that will answer with `replies`, first to last.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue one more reply.
    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(reply.into());
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<Vec<ChatTurn>> {
        self.requests.lock().await.clone()
    }
}

impl Completion for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatTurn]) -> String {
        self.requests.lock().await.push(messages.to_vec());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| error_text("script exhausted"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": { "content": "You found an apple! <balance=900>" }
            }]
        });
        let result = extract_openai_content(&json);
        assert!(result.unwrap_or_default().contains("<balance=900>"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{ "type": "text", "text": "<valid=true>" }]
        });
        assert_eq!(extract_anthropic_content(&json).unwrap_or_default(), "<valid=true>");
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn openai_body_keeps_roles_in_order() {
        let messages = vec![
            ChatTurn::system("rules"),
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
        ];
        let body = openai_body("m", &messages);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m.get("role").and_then(serde_json::Value::as_str))
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn anthropic_body_hoists_system_prompt() {
        let messages = vec![ChatTurn::system("rules"), ChatTurn::user("hi")];
        let body = anthropic_body("m", &messages);
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["max_tokens"], MAX_TOKENS);
    }

    #[test]
    fn error_text_is_detectable() {
        let text = error_text("connection failed: timeout");
        assert!(text.starts_with(ERROR_MARKER));
        assert!(is_error_text(&text));
        assert!(!is_error_text("You found a coin."));
        assert!(!is_error_text("The terminal flashes 'Error: 404'."));
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let mut config = LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "https://openrouter.ai/api/v1/".to_owned(),
            api_key: "test".to_owned(),
            model: "openai/gpt-3.5-turbo".to_owned(),
            timeout: crate::config::DEFAULT_TIMEOUT,
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "openai-compatible");
        assert_eq!(backend.model(), "openai/gpt-3.5-turbo");

        config.backend_type = BackendType::Anthropic;
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "anthropic");
    }

    #[tokio::test]
    async fn unreachable_backend_yields_marked_error_text() {
        let config = LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "http://127.0.0.1:9".to_owned(),
            api_key: "test".to_owned(),
            model: "m".to_owned(),
            timeout: std::time::Duration::from_secs(2),
        };
        let backend = create_backend(&config).unwrap();
        let text = backend.complete(&[ChatTurn::user("hello")]).await;
        assert!(text.starts_with("Error: connection failed"), "got: {text}");
    }

    #[tokio::test]
    async fn scripted_completion_replays_and_records() {
        let stub = ScriptedCompletion::new(["first", "second"]);
        assert_eq!(stub.complete(&[ChatTurn::user("a")]).await, "first");
        assert_eq!(stub.complete(&[ChatTurn::user("b")]).await, "second");
        assert!(is_error_text(&stub.complete(&[ChatTurn::user("c")]).await));

        let requests = stub.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests.get(1).and_then(|r| r.first()).map(|t| t.content.as_str()), Some("b"));
    }
}
