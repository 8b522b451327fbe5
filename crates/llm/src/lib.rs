//! LLM integration crate for Catalyst.
//!
//! This crate provides a provider-agnostic abstraction for invoking a
//! generative model in either structured (JSON) or free-text mode.
//!
//! # Providers
//! - **OpenAI**: any OpenAI-compatible chat completions endpoint (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use catalyst_llm::{create_client, http_client, LlmRequest, ResponseMode};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = http_client(Duration::from_secs(30))?;
//! let client = create_client("ollama", None, None, http)?;
//! let request = LlmRequest::new("Reply with {}", "llama3").with_mode(ResponseMode::Json);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod test_server;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, Sampling};
pub use factory::{create_client, http_client};
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{ChatMessage, ProviderType, ResponseMode, Role};
