/// LLM Client — the single point of entry for all model calls in Albert.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The pipeline depends on the `GenerationClient` trait; `LlmClient` is the
/// production implementation.
///
/// Each `complete` call is exactly one HTTP request. There is no transport-level
/// retry here: a submission makes at most two model calls and the pipeline owns
/// that budget.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all generation calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("quota exhausted or rate limited (status {status})")]
    Quota { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / result values
// ────────────────────────────────────────────────────────────────────────────

/// A fully assembled prompt plus sampling parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GenerationRequest {
    /// Temperature is clamped into [0, 1].
    pub fn new(prompt: String, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            prompt,
            temperature: temperature.clamp(0.0, 1.0),
            max_output_tokens,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    /// A new request carrying this prompt followed by `instruction`.
    pub fn with_appended(&self, instruction: &str, temperature: f32) -> Self {
        Self::new(
            format!("{}\n{}", self.prompt, instruction),
            temperature,
            self.max_output_tokens,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Attempt {
    First,
    Corrective,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub text: String,
    pub attempt: Attempt,
}

/// Anything that turns a prompt into text.
///
/// Carried in `AppState` as `Arc<dyn GenerationClient>`.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier recorded alongside each interaction.
    fn model(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Production generation client wrapping the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl GenerationClient for LlmClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: request.max_output_tokens(),
            temperature: request.temperature(),
            system: prompts::SYSTEM_PROMPT,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(GenerationError::Quota {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;
        let llm_response: LlmResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        extract_text(&llm_response)
    }

    fn model(&self) -> &str {
        MODEL
    }
}

fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout(timeout)
    } else {
        GenerationError::Http(error)
    }
}

/// Returns the first non-blank text block.
fn extract_text(response: &LlmResponse) -> Result<String, GenerationError> {
    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(GenerationError::EmptyContent),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test double
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays scripted responses in order and records every request it sees.
    pub struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedClient {
        pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyContent))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}
