//! LLM client abstraction and request/response types.
//!
//! This module defines the single "invoke generative model" capability used
//! by both the planning call (JSON mode) and the synthesis call (text mode).

use crate::types::{ChatMessage, ResponseMode};
use catalyst_core::AppResult;
use serde::{Deserialize, Serialize};

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier (e.g., "gpt-4o", "llama3.2")
    pub model: String,

    /// Conversation sent to the model, in order
    pub messages: Vec<ChatMessage>,

    /// Structured (JSON) or plain-text output
    #[serde(default)]
    pub mode: ResponseMode,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a request whose sole message is `prompt` from the user.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            mode: ResponseMode::Text,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the response mode.
    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Apply whichever sampling controls are set.
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        if let Some(temperature) = sampling.temperature {
            self = self.with_temperature(temperature);
        }
        if let Some(max_tokens) = sampling.max_tokens {
            self = self.with_max_tokens(max_tokens);
        }
        self
    }
}

/// Optional sampling controls shared by every request a component sends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    #[serde(default)]
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations must be safe for concurrent use; a single client is built
/// at startup and shared by every query.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "openai", "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a single, non-streaming completion.
    ///
    /// Non-success responses and responses without any generated content
    /// are errors; an empty string is never returned for a failed call.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
