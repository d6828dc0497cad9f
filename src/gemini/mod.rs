//! Gemini generateContent client: unary, schema-constrained, and streaming.

pub mod client;
pub mod types;

pub use client::{GeminiChat, GeminiClient};
pub use types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};

use std::pin::Pin;

use futures_util::Stream;

/// Stream of text deltas from a streaming generation call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GeminiError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode streamed response: {0}")]
    Decode(String),
}
