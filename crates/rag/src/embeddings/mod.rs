//! Embedding capability.
//!
//! Maps text to a fixed-length vector for semantic search and ingestion.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{HttpEmbeddingProvider, MockProvider};
