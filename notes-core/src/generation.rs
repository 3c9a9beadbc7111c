//! Summary generation for Session Notes.
//!
//! Turns raw session notes into a clinical summary by sending a fixed prompt
//! to an OpenAI-compatible chat completions endpoint.
//!
//! - `SummaryBackend` is the seam to the remote model; `OpenAiChatClient` is
//!   the production implementation.
//! - `SummaryGenerator` owns prompt construction and output trimming.
//!
//! Every failure is terminal for the request. There is no retry and no cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OpenAiConfig;

/// Substituted for an empty or missing session type / duration.
pub const NOT_SPECIFIED: &str = "not specified";

/// Fixed system instruction for every completion.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant for therapists.";

// ============================================================================
// Request / prompt types
// ============================================================================

/// Inbound body of `POST /generate-notes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, rename = "sessionType", alias = "session_type")]
    pub session_type: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    pub notes: String,
}

/// The two messages sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPrompt {
    pub system: String,
    pub user: String,
}

fn or_not_specified(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => NOT_SPECIFIED,
    }
}

/// Build the deterministic prompt for a generation request.
pub fn build_prompt(req: &GenerateRequest) -> SummaryPrompt {
    let session_type = or_not_specified(req.session_type.as_deref());
    let duration = or_not_specified(req.duration.as_deref());

    let user = format!(
        "As a professional therapist, I need to convert raw session notes into \
         well-written, professional, and consistent notes for documentation\n\
         in a clinical writing style.\n\
         \n\
         The session details are as follows:\n\
         - Duration: {duration}\n\
         - Type: {session_type}\n\
         \n\
         The raw notes are:\n\
         {raw_notes}\n\
         \n\
         Please provide a professional and concise summary of the session based on these details.",
        duration = duration,
        session_type = session_type,
        raw_notes = req.notes,
    );

    SummaryPrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Tagged failure of a generation call. Callers currently treat every variant
/// the same way, but the tags leave room for a per-kind policy.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response contained no choices")]
    EmptyCompletion,
}

// ============================================================================
// SummaryBackend trait
// ============================================================================

/// Abstraction over text-generation providers.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Send one single-turn conversation and return the first choice's text.
    async fn complete(&self, prompt: &SummaryPrompt) -> Result<String, GenerationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Chat completions API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

/// Chat completions client with fixed model, length cap and temperature.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        if config.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SummaryBackend for OpenAiChatClient {
    async fn complete(&self, prompt: &SummaryPrompt) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(body);

            tracing::error!(code = status.as_u16(), message = %message, "Chat completions API error");

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::RateLimited { message });
            }
            return Err(GenerationError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyCompletion)?;

        first
            .message
            .content
            .ok_or_else(|| GenerationError::MalformedResponse("choice has no content".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// SummaryGenerator
// ============================================================================

/// Builds prompts and delegates to a `SummaryBackend`.
#[derive(Clone)]
pub struct SummaryGenerator {
    backend: Arc<dyn SummaryBackend>,
}

impl SummaryGenerator {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self { backend }
    }

    /// Generator backed by the chat completions API.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, GenerationError> {
        Ok(Self::new(Arc::new(OpenAiChatClient::new(config.clone())?)))
    }

    /// Generate a summary. The result is trimmed of surrounding whitespace.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<String, GenerationError> {
        let prompt = build_prompt(req);
        tracing::debug!(
            backend = self.backend.name(),
            prompt_len = prompt.user.len(),
            "Requesting session summary"
        );

        match self.backend.complete(&prompt).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "Summary generation failed");
                Err(e)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
