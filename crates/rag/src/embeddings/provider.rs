//! Embedding provider trait and factory.

use super::providers::{HttpEmbeddingProvider, MockProvider};
use catalyst_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "http", "mock")
    fn provider_name(&self) -> &str;

    /// Generate the embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Generate embeddings for several texts, one call per text.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Create the configured embedding provider.
///
/// `http` is the shared client; only the HTTP provider uses it.
pub fn create_provider(
    config: &AppConfig,
    http: reqwest::Client,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "http" => Ok(Arc::new(HttpEmbeddingProvider::new(
            config.embedding_url.clone(),
            http,
        ))),

        "mock" => Ok(Arc::new(MockProvider::new(config.embedding_dimensions))),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: http, mock",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let config = AppConfig {
            embedding_provider: "mock".to_string(),
            embedding_dimensions: 64,
            ..AppConfig::default()
        };

        let provider = create_provider(&config, reqwest::Client::new()).unwrap();
        assert_eq!(provider.provider_name(), "mock");
    }

    #[test]
    fn test_create_http_provider_by_default() {
        let provider = create_provider(&AppConfig::default(), reqwest::Client::new()).unwrap();
        assert_eq!(provider.provider_name(), "http");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = AppConfig {
            embedding_provider: "unknown".to_string(),
            ..AppConfig::default()
        };

        let result = create_provider(&config, reqwest::Client::new());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_default_batch_embeds_each_text() {
        let provider = MockProvider::new(32);
        let texts = vec!["first text".to_string(), "second text".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_ne!(embeddings[0], embeddings[1]);
    }
}
