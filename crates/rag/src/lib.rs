//! Hybrid retrieval-augmented question answering.
//!
//! A question is planned into tool calls by a model, the calls gather
//! structured facts and ranked passages from the evidence store, and a
//! second model call synthesizes the answer from that evidence.

pub mod embeddings;
pub mod executor;
pub mod index;
pub mod ingest;
pub mod merge;
pub mod pipeline;
pub mod planner;
pub mod sources;
pub mod synthesizer;
pub mod timeout;
pub mod tools;
pub mod types;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingProvider, HttpEmbeddingProvider, MockProvider};
pub use executor::{RetrievalSettings, ToolExecutor};
pub use index::{
    Comment, CommentSearch, KnowledgeSearch, SqliteStore, StoreStats, COMMENTS_SOURCE,
    KNOWLEDGE_SOURCE,
};
pub use ingest::{
    add_comment, ingest_chunks, ingest_chunks_file, ingest_facts, ingest_facts_file, ChunkInput,
    CommentReceipt, IngestStats,
};
pub use merge::{compare_scores, merge_hits};
pub use pipeline::{
    ErrorResponse, HybridQueryEngine, PipelineState, QueryAnswer, QueryError, QueryRun, Stage,
};
pub use planner::{parse_plan, strip_code_fences, Planner};
pub use sources::{FactStore, PassageSearch};
pub use synthesizer::Synthesizer;
pub use tools::{resolve_plan, ToolCall};
pub use types::{EvidenceBundle, ExecutionPlan, FactKind, FactRecord, SearchHit, ToolInvocation};
