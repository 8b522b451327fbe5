//! Loading evidence into the SQLite store.

use crate::embeddings::EmbeddingProvider;
use crate::index::{Comment, SqliteStore};
use crate::types::FactRecord;
use catalyst_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A knowledge chunk as found in an ingest file.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkInput {
    pub mission_name: String,
    pub text: String,
}

/// Result of an ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub stored: usize,
    pub skipped: usize,
}

/// Outcome of adding a comment.
#[derive(Debug, Clone, Serialize)]
pub struct CommentReceipt {
    pub comment: Comment,

    /// `false` when embedding failed; the comment is saved but not searchable
    pub embedded: bool,
}

/// Upsert every record of a JSON array file into `mission_facts`.
pub fn ingest_facts_file(store: &SqliteStore, path: &Path) -> AppResult<IngestStats> {
    let records: Vec<FactRecord> = read_json_array(path)?;
    ingest_facts(store, &records)
}

/// Upsert records. Each must carry a `mission_name`.
pub fn ingest_facts(store: &SqliteStore, records: &[FactRecord]) -> AppResult<IngestStats> {
    let mut stats = IngestStats::default();
    for record in records {
        let mission_name = store.upsert_mission_facts(record)?;
        tracing::debug!(mission_name = %mission_name, "Stored mission facts");
        stats.stored += 1;
    }

    tracing::info!(stored = stats.stored, "Ingested mission facts");
    Ok(stats)
}

/// Embed and store every chunk of a JSON array file.
pub async fn ingest_chunks_file(
    store: &SqliteStore,
    embedder: &dyn EmbeddingProvider,
    path: &Path,
) -> AppResult<IngestStats> {
    let chunks: Vec<ChunkInput> = read_json_array(path)?;
    ingest_chunks(store, embedder, &chunks).await
}

/// Embed and store chunks. Blank chunks are skipped; an embedding failure
/// stops the run, since a chunk without a vector can never be retrieved.
pub async fn ingest_chunks(
    store: &SqliteStore,
    embedder: &dyn EmbeddingProvider,
    chunks: &[ChunkInput],
) -> AppResult<IngestStats> {
    let mut stats = IngestStats::default();

    for chunk in chunks {
        let text = chunk.text.trim();
        if text.is_empty() || chunk.mission_name.trim().is_empty() {
            tracing::warn!(mission_name = %chunk.mission_name, "Skipping blank chunk");
            stats.skipped += 1;
            continue;
        }

        let embedding = embedder.embed(text).await?;
        store.insert_knowledge_chunk(chunk.mission_name.trim(), text, &embedding)?;
        stats.stored += 1;
    }

    tracing::info!(
        stored = stats.stored,
        skipped = stats.skipped,
        provider = embedder.provider_name(),
        "Ingested knowledge chunks"
    );
    Ok(stats)
}

/// Save a comment, then try to embed it.
///
/// The comment is persisted first. If embedding fails it stays saved and a
/// warning is logged.
pub async fn add_comment(
    store: &SqliteStore,
    embedder: &dyn EmbeddingProvider,
    item_id: &str,
    user_id: &str,
    text: &str,
) -> AppResult<CommentReceipt> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Input("Comment text cannot be empty".to_string()));
    }
    if item_id.trim().is_empty() {
        return Err(AppError::Input("Item id cannot be empty".to_string()));
    }

    let mut comment = store.add_comment(item_id, user_id, text)?;

    let embedded = match embedder.embed(text).await {
        Ok(embedding) => match store.set_comment_embedding(&comment.id, &embedding) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    comment_id = %comment.id,
                    error = %e,
                    "Failed to store comment embedding"
                );
                false
            }
        },
        Err(e) => {
            tracing::warn!(
                comment_id = %comment.id,
                error = %e,
                "Failed to embed comment; it will not be searchable"
            );
            false
        }
    };

    comment.embedded = embedded;
    Ok(CommentReceipt { comment, embedded })
}

fn read_json_array<T: for<'de> Deserialize<'de>>(path: &Path) -> AppResult<Vec<T>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        AppError::Input(format!(
            "{} is not a valid JSON array for this ingest: {}",
            path.display(),
            e
        ))
    })
}
