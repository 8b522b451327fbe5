//! Evidence source seams used by the tool executor.

use crate::types::{FactRecord, SearchHit};
use catalyst_core::{AppResult, ScoreOrder};

/// Structured-fact lookup keyed by mission name.
#[async_trait::async_trait]
pub trait FactStore: Send + Sync {
    /// `Ok(None)` means the mission is unknown, not that the lookup failed.
    async fn mission_facts(&self, mission_name: &str) -> AppResult<Option<FactRecord>>;
}

/// A semantic-search backend queried with a query vector.
#[async_trait::async_trait]
pub trait PassageSearch: Send + Sync {
    /// Provenance tag stamped on every hit this backend returns.
    fn source(&self) -> &str;

    /// Return the best `top_n` hits for `query_embedding`, where "best"
    /// follows `order`.
    async fn search(
        &self,
        query_embedding: &[f32],
        top_n: usize,
        order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>>;
}
