//! SQLite-backed evidence store.
//!
//! Holds mission fact records, embedded knowledge chunks and user comments,
//! and serves the structured-fact lookup and both semantic-search backends.

use crate::merge::compare_scores;
use crate::sources::{FactStore, PassageSearch};
use crate::types::{FactRecord, SearchHit};
use catalyst_core::{AppError, AppResult, ScoreOrder};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Provenance tag of the knowledge-chunk backend.
pub const KNOWLEDGE_SOURCE: &str = "mission_knowledge";

/// Provenance tag of the comment backend.
pub const COMMENTS_SOURCE: &str = "comments";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mission_facts (
    mission_name TEXT PRIMARY KEY,
    record TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mission_knowledge (
    id TEXT PRIMARY KEY,
    mission_name TEXT NOT NULL,
    chunk_text TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    comment TEXT NOT NULL,
    created_at TEXT NOT NULL,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_knowledge_mission ON mission_knowledge(mission_name);
CREATE INDEX IF NOT EXISTS idx_comments_item ON comments(item_id);
"#;

/// A stored comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub embedded: bool,
}

/// Row counts reported by `catalyst stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub facts: u64,
    pub chunks: u64,
    pub comments: u64,
    pub embedded_comments: u64,
}

/// Evidence store over a single SQLite connection.
///
/// The connection sits behind a mutex; every method holds the lock only
/// for the duration of its statements. Methods are blocking; the async
/// trait impls run them on the blocking pool. Clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("Failed to open SQLite store: {}", e)))?;

        tracing::debug!("Opened evidence store at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Storage(format!("Failed to open SQLite store: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Storage(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("Evidence store lock poisoned".to_string()))
    }

    /// Insert or replace a mission record. The record must carry a
    /// non-empty string `mission_name`, which is returned.
    pub fn upsert_mission_facts(&self, record: &FactRecord) -> AppResult<String> {
        let mission_name = record
            .get("mission_name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                AppError::Input("Mission record is missing a 'mission_name' string".to_string())
            })?
            .to_string();

        let json = serde_json::to_string(record)?;

        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO mission_facts (mission_name, record) VALUES (?1, ?2)",
                params![mission_name, json],
            )
            .map_err(|e| AppError::Storage(format!("Failed to upsert mission facts: {}", e)))?;

        Ok(mission_name)
    }

    /// Fetch the record for `mission_name`, if any.
    pub fn get_mission_facts(&self, mission_name: &str) -> AppResult<Option<FactRecord>> {
        let json: Option<String> = self
            .conn()?
            .query_row(
                "SELECT record FROM mission_facts WHERE mission_name = ?1",
                params![mission_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Storage(format!("Failed to query mission facts: {}", e)))?;

        json.map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                AppError::Storage(format!(
                    "Corrupt record for mission '{}': {}",
                    mission_name, e
                ))
            })
        })
        .transpose()
    }

    /// Store an embedded knowledge chunk and return its id.
    pub fn insert_knowledge_chunk(
        &self,
        mission_name: &str,
        chunk_text: &str,
        embedding: &[f32],
    ) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();

        self.conn()?
            .execute(
                "INSERT INTO mission_knowledge (id, mission_name, chunk_text, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, mission_name, chunk_text, embedding_to_bytes(embedding)],
            )
            .map_err(|e| AppError::Storage(format!("Failed to insert chunk: {}", e)))?;

        Ok(id)
    }

    /// Best `top_n` knowledge chunks by cosine similarity, ranked by `order`.
    pub fn search_knowledge(
        &self,
        query_embedding: &[f32],
        top_n: usize,
        order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        let rows = self.load_rows("SELECT chunk_text, embedding FROM mission_knowledge")?;
        rank_rows(KNOWLEDGE_SOURCE, rows, query_embedding, top_n, order)
    }

    /// Store a comment without an embedding.
    pub fn add_comment(&self, item_id: &str, user_id: &str, text: &str) -> AppResult<Comment> {
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            comment: text.to_string(),
            created_at: Utc::now(),
            embedded: false,
        };

        self.conn()?
            .execute(
                "INSERT INTO comments (id, item_id, user_id, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    comment.id,
                    comment.item_id,
                    comment.user_id,
                    comment.comment,
                    comment.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| AppError::Storage(format!("Failed to insert comment: {}", e)))?;

        Ok(comment)
    }

    /// Attach an embedding to an existing comment.
    pub fn set_comment_embedding(&self, comment_id: &str, embedding: &[f32]) -> AppResult<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE comments SET embedding = ?1 WHERE id = ?2",
                params![embedding_to_bytes(embedding), comment_id],
            )
            .map_err(|e| AppError::Storage(format!("Failed to update comment embedding: {}", e)))?;

        if updated == 0 {
            return Err(AppError::Storage(format!(
                "Comment '{}' does not exist",
                comment_id
            )));
        }
        Ok(())
    }

    /// Comments on `item_id`, oldest first.
    pub fn list_comments(&self, item_id: &str) -> AppResult<Vec<Comment>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, item_id, user_id, comment, created_at, embedding IS NOT NULL
                 FROM comments WHERE item_id = ?1 ORDER BY rowid",
            )
            .map_err(|e| AppError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![item_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            })
            .map_err(|e| AppError::Storage(format!("Failed to query comments: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Storage(format!("Failed to read comment row: {}", e)))?;

        rows.into_iter()
            .map(|(id, item_id, user_id, comment, created_at, embedded)| {
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| AppError::Storage(format!("Invalid comment timestamp: {}", e)))?
                    .with_timezone(&Utc);
                Ok(Comment {
                    id,
                    item_id,
                    user_id,
                    comment,
                    created_at,
                    embedded,
                })
            })
            .collect()
    }

    /// Best `top_n` embedded comments by cosine similarity, ranked by
    /// `order`. Comments without an embedding are skipped.
    pub fn search_comments(
        &self,
        query_embedding: &[f32],
        top_n: usize,
        order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        let rows = self.load_rows(
            "SELECT comment, embedding FROM comments WHERE embedding IS NOT NULL",
        )?;
        rank_rows(COMMENTS_SOURCE, rows, query_embedding, top_n, order)
    }

    /// Read `(text, embedding bytes)` rows. The lock is released before ranking.
    fn load_rows(&self, sql: &str) -> AppResult<Vec<(String, Vec<u8>)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))
            .map_err(|e| AppError::Storage(format!("Failed to query rows: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Storage(format!("Failed to read row: {}", e)))?;

        Ok(rows)
    }

    /// Row counts per table.
    pub fn stats(&self) -> AppResult<StoreStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> AppResult<u64> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v as u64)
                .map_err(|e| AppError::Storage(format!("Failed to count rows: {}", e)))
        };

        Ok(StoreStats {
            facts: count("SELECT COUNT(*) FROM mission_facts")?,
            chunks: count("SELECT COUNT(*) FROM mission_knowledge")?,
            comments: count("SELECT COUNT(*) FROM comments")?,
            embedded_comments: count("SELECT COUNT(*) FROM comments WHERE embedding IS NOT NULL")?,
        })
    }
}

/// Run blocking store work on the blocking pool.
///
/// If the caller stops waiting (timeout or cancellation) the work still
/// finishes in the background, but the request no longer waits on it.
async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Storage(format!("Store task failed: {}", e)))?
}

#[async_trait::async_trait]
impl FactStore for SqliteStore {
    async fn mission_facts(&self, mission_name: &str) -> AppResult<Option<FactRecord>> {
        let store = self.clone();
        let mission_name = mission_name.to_string();
        run_blocking(move || store.get_mission_facts(&mission_name)).await
    }
}

/// Knowledge-chunk search backend over a shared store.
pub struct KnowledgeSearch(pub Arc<SqliteStore>);

#[async_trait::async_trait]
impl PassageSearch for KnowledgeSearch {
    fn source(&self) -> &str {
        KNOWLEDGE_SOURCE
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_n: usize,
        order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        let store = Arc::clone(&self.0);
        let query = query_embedding.to_vec();
        run_blocking(move || store.search_knowledge(&query, top_n, order)).await
    }
}

/// Comment search backend over a shared store.
pub struct CommentSearch(pub Arc<SqliteStore>);

#[async_trait::async_trait]
impl PassageSearch for CommentSearch {
    fn source(&self) -> &str {
        COMMENTS_SOURCE
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_n: usize,
        order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        let store = Arc::clone(&self.0);
        let query = query_embedding.to_vec();
        run_blocking(move || store.search_comments(&query, top_n, order)).await
    }
}

fn rank_rows(
    source: &str,
    rows: Vec<(String, Vec<u8>)>,
    query_embedding: &[f32],
    top_n: usize,
    order: ScoreOrder,
) -> AppResult<Vec<SearchHit>> {
    let mut hits = Vec::with_capacity(rows.len());
    let mut mismatched = 0usize;

    for (text, bytes) in rows {
        let embedding = bytes_to_embedding(&bytes)?;
        if embedding.len() != query_embedding.len() {
            mismatched += 1;
            continue;
        }
        hits.push(SearchHit::new(
            source,
            text,
            cosine_similarity(query_embedding, &embedding),
        ));
    }

    if mismatched > 0 {
        tracing::warn!(
            source,
            skipped = mismatched,
            query_dimensions = query_embedding.len(),
            "Skipped rows embedded with a different dimension; re-ingest them"
        );
    }

    hits.sort_by(|a, b| compare_scores(a.score, b.score, order));
    hits.truncate(top_n);

    tracing::debug!(source, hits = hits.len(), "Vector search complete (top-{})", top_n);

    Ok(hits)
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Storage(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Cosine similarity of two vectors of equal length.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
