//! Answer generation
//!
//! A [`LanguageModel`] turns a prompt into text. [`AnswerComposer`] builds
//! the grounding prompt from retrieved chunks and converts every model
//! failure into an [`Answer`] the caller can show as-is.

mod client;
mod composer;

pub use client::CompletionClient;
pub use composer::{Answer, AnswerComposer, AnswerOutcome, FALLBACK_ANSWER, NO_CONTEXT_TEXT};

use crate::config::GenerationConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Client initialization failed: {0}")]
    InitializationError(String),

    #[error("Request failed: {0}")]
    NetworkError(String),

    #[error("Rate limited by completion server")]
    RateLimited,

    #[error("Completion server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Worth another attempt after a pause
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::NetworkError(_) | GenerationError::RateLimited => true,
            GenerationError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
}

impl GenerationParams {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stop: config.stop.clone(),
        }
    }
}

/// Anything that can complete a prompt
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}
