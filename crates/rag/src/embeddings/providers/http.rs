//! HTTP embedding service provider.
//!
//! Contract: `POST {url}` with `{"text": "..."}` answers
//! `{"embedding": [f32, ...]}`.

use crate::embeddings::EmbeddingProvider;
use catalyst_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a plain HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    url: String,
    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "http"
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding(
                "Cannot embed empty text".to_string(),
            ));
        }

        debug!(url = %self.url, chars = text.len(), "Requesting embedding");

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { text })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to call embedding service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Embedding service returned non-OK status {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Embedding(format!("Failed to decode embedding response: {}", e))
        })?;

        if parsed.embedding.is_empty() {
            return Err(AppError::Embedding(
                "Embedding service returned an empty vector".to_string(),
            ));
        }

        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::serve_once;

    #[tokio::test]
    async fn test_embed_posts_text_and_reads_vector() {
        let (url, server) = serve_once(200, r#"{"embedding":[0.25,-0.5,1.0]}"#).await;
        let provider = HttpEmbeddingProvider::new(format!("{}/embed", url), reqwest::Client::new());

        let embedding = provider.embed("apollo fuel cells").await.unwrap();
        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /embed"));
        assert!(raw_request.ends_with(r#"{"text":"apollo fuel cells"}"#));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_embedding_error() {
        let (url, _server) = serve_once(503, r#"{"detail":"model loading"}"#).await;
        let provider = HttpEmbeddingProvider::new(url, reqwest::Client::new());

        let err = provider.embed("query").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_empty_vector_is_embedding_error() {
        let (url, _server) = serve_once(200, r#"{"embedding":[]}"#).await;
        let provider = HttpEmbeddingProvider::new(url, reqwest::Client::new());
        assert!(provider.embed("query").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_network() {
        let provider =
            HttpEmbeddingProvider::new("http://127.0.0.1:9/embed", reqwest::Client::new());
        let err = provider.embed("  ").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_embedding_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            HttpEmbeddingProvider::new(format!("http://{}/embed", addr), reqwest::Client::new());
        let err = provider.embed("query").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }
}
