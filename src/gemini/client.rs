//! HTTP client for the Gemini generateContent API.
//!
//! One client serves all three capability seams: blocking text generation
//! (analysis), multimodal extraction (vision), and streaming chat. The
//! trait impls at the bottom wire it into the pipeline and chat modules.

use std::env;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{
    ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::{GeminiError, TextStream};
use crate::chat::{ChatBackend, ChatError, ChatRole, ChatSession, ChatTurn, DeltaStream};
use crate::config;
use crate::pipeline::analysis::LlmGenerate;
use crate::pipeline::extraction::{ExtractionError, InlineImage, VisionExtractor};

/// Total-request timeout for unary calls. Generous because multimodal
/// payloads (one image per PDF page) can take a while to process.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connect timeout for every call, including streaming (which has no
/// total-request timeout — delta arrival is open-ended).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from `GEMINI_API_KEY` (and the optional model /
    /// base-URL overrides in `config`).
    pub fn from_env() -> Result<Self, GeminiError> {
        let api_key = env::var(config::ENV_API_KEY).map_err(|_| GeminiError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(GeminiError::ApiKeyNotSet);
        }
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model: config::model_id(),
            base_url: config::api_base(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            api_key: ApiKey("test-key".to_string()),
            model: config::DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn endpoint(&self, verb: &str) -> String {
        format!("{}/{}:{}", self.base_url, self.model, verb)
    }

    /// One-shot generation. Returns the candidate text as-is — empty
    /// output is a policy question for the caller, not an error here.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, GeminiError> {
        let url = self.endpoint("generateContent");
        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_failure(status, response).await);
        }

        let body: GenerateContentResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        let text = body.text();
        debug!(model = %self.model, response_len = text.len(), "generation complete");
        Ok(text)
    }

    /// Streaming generation over SSE (`alt=sse`). Each yielded item is one
    /// text delta; the stream ends when the response body does.
    pub async fn stream_generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<TextStream, GeminiError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_failure(status, response).await);
        }

        debug!(model = %self.model, "stream opened");
        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

async fn classify_http_failure(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> GeminiError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        warn!("Gemini API rate limited");
        return GeminiError::RateLimited;
    }
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text) {
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error");
            return classified;
        }
    }
    let snippet: String = text.chars().take(200).collect();
    warn!(status = %status, "Gemini API error (no structured body)");
    GeminiError::Api {
        code: status.as_u16(),
        message: format!("HTTP {status}: {snippet}"),
    }
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api { code: 0, message },
    }
}

// ──────────────────────────────────────────────
// SSE parsing
// ──────────────────────────────────────────────

struct SseState {
    bytes: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: String,
    done: bool,
}

/// Parse `data:` lines from a Gemini SSE body into text deltas.
///
/// Chunk boundaries do not align with line boundaries, so bytes are
/// buffered until a full line is available. Chunks whose candidate carries
/// no text (e.g. a final usage-only chunk) are skipped, not yielded.
fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> TextStream {
    Box::pin(futures_util::stream::unfold(
        SseState {
            bytes: Box::pin(byte_stream),
            buffer: String::new(),
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }
            loop {
                while let Some(line_end) = state.buffer.find('\n') {
                    let line = state.buffer[..line_end].trim().to_string();
                    state.buffer = state.buffer[line_end + 1..].to_string();

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data.is_empty() || data == "[DONE]" {
                        continue;
                    }

                    match serde_json::from_str::<GenerateContentResponse>(data) {
                        Ok(chunk) => {
                            if let Some(err) = &chunk.error {
                                state.done = true;
                                return Some((Err(classify_api_error(err)), state));
                            }
                            let text = chunk.text();
                            if !text.is_empty() {
                                return Some((Ok(text), state));
                            }
                        }
                        Err(e) => {
                            state.done = true;
                            return Some((Err(GeminiError::Decode(e.to_string())), state));
                        }
                    }
                }

                match state.bytes.next().await {
                    Some(Ok(bytes)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(GeminiError::Network(e)), state));
                    }
                    None => return None,
                }
            }
        },
    ))
}

// ──────────────────────────────────────────────
// Capability seams
// ──────────────────────────────────────────────

#[async_trait]
impl LlmGenerate for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        self.generate_content(&GenerateContentRequest::from_parts(vec![Part::text(prompt)]))
            .await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationConfig::json_schema(schema)),
        };
        self.generate_content(&request).await
    }
}

#[async_trait]
impl VisionExtractor for GeminiClient {
    async fn extract_text(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String, ExtractionError> {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(prompt));
        for image in images {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
            parts.push(Part::inline_data(image.mime_type, encoded));
        }
        let text = self
            .generate_content(&GenerateContentRequest::from_parts(parts))
            .await?;
        Ok(text)
    }
}

impl ChatBackend for GeminiClient {
    fn create_session(&self, seed: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        Box::new(GeminiChat {
            client: self.clone(),
            history: Arc::new(Mutex::new(seed)),
        })
    }
}

// ──────────────────────────────────────────────
// Chat session
// ──────────────────────────────────────────────

/// A multi-turn chat session over the stateless generateContent API.
///
/// The full history (seed + committed turns) is resent on every question.
/// The pending user turn is committed together with the model's answer
/// only when the stream ends cleanly; any failure rolls it back so the
/// session is left exactly as before the question.
pub struct GeminiChat {
    client: GeminiClient,
    history: Arc<Mutex<Vec<ChatTurn>>>,
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send_streaming(&mut self, message: &str) -> Result<DeltaStream, ChatError> {
        if let Ok(mut history) = self.history.lock() {
            history.push(ChatTurn {
                role: ChatRole::User,
                text: message.to_string(),
            });
        }

        let contents: Vec<Content> = self
            .history
            .lock()
            .map(|history| history.iter().map(content_from_turn).collect())
            .unwrap_or_default();

        let request = GenerateContentRequest {
            contents,
            generation_config: None,
        };
        match self.client.stream_generate_content(&request).await {
            Ok(deltas) => Ok(commit_on_completion(deltas, Arc::clone(&self.history))),
            Err(e) => {
                rollback_pending_turn(&self.history);
                Err(ChatError::Backend(e))
            }
        }
    }

    fn history(&self) -> Vec<ChatTurn> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

fn content_from_turn(turn: &ChatTurn) -> Content {
    Content {
        parts: vec![Part::text(&turn.text)],
        role: Some(turn.role.as_str().to_string()),
    }
}

struct CommitState {
    inner: TextStream,
    acc: String,
    history: Arc<Mutex<Vec<ChatTurn>>>,
    failed: bool,
}

/// Forward deltas, accumulating the answer. On clean completion the model
/// turn is appended to the session history; on error the pending user turn
/// is rolled back and the stream ends after yielding the error.
fn commit_on_completion(inner: TextStream, history: Arc<Mutex<Vec<ChatTurn>>>) -> DeltaStream {
    Box::pin(futures_util::stream::unfold(
        CommitState {
            inner,
            acc: String::new(),
            history,
            failed: false,
        },
        |mut state| async move {
            if state.failed {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(delta)) => {
                    state.acc.push_str(&delta);
                    Some((Ok(delta), state))
                }
                Some(Err(e)) => {
                    state.failed = true;
                    rollback_pending_turn(&state.history);
                    Some((Err(ChatError::Backend(e)), state))
                }
                None => {
                    if let Ok(mut history) = state.history.lock() {
                        history.push(ChatTurn {
                            role: ChatRole::Model,
                            text: std::mem::take(&mut state.acc),
                        });
                    }
                    None
                }
            }
        },
    ))
}

fn rollback_pending_turn(history: &Arc<Mutex<Vec<ChatTurn>>>) {
    if let Ok(mut history) = history.lock() {
        if history.last().map(|t| t.role == ChatRole::User).unwrap_or(false) {
            history.pop();
        }
    }
}
