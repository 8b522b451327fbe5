//! LLM provider factory.
//!
//! This module builds the shared HTTP client and resolves the configured
//! provider name into a concrete `LlmClient`.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use catalyst_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Build the HTTP client shared by every outbound call.
///
/// `timeout` bounds each request end to end, including reading the body.
pub fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL; the provider default otherwise
/// * `api_key` - API key (required by OpenAI)
/// * `http` - Shared HTTP client
///
/// # Errors
/// Returns error if the provider is unknown or a required API key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    http: reqwest::Client,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(base_url, http))),
        ProviderType::OpenAI => {
            let api_key = api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config("OpenAI provider requires API key".to_string())
                })?;
            Ok(Arc::new(OpenAiClient::new(base_url, api_key, http)))
        }
    }
}
