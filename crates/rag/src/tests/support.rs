//! In-process fakes for the model, the embedder and the evidence sources.

use crate::embeddings::EmbeddingProvider;
use crate::sources::{FactStore, PassageSearch};
use crate::types::{FactRecord, SearchHit};
use catalyst_core::{AppError, AppResult, ScoreOrder};
use catalyst_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use catalyst_llm::test_server::serve_once;

/// A JSON object literal as a fact record.
pub fn record(value: Value) -> FactRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("fact record must be an object, got {}", other),
    }
}

enum Reply {
    Text(String),
    Fail(AppError),
    Echo,
}

/// Model fake that answers from a script, recording every request.
///
/// Once the script runs out, further calls fail.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<AppResult<String>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|r| match r {
                Ok(text) => Reply::Text(text),
                Err(e) => Reply::Fail(e),
            })
            .collect();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer the first call with `plan`, then echo every later prompt back.
    pub fn plan_then_echo(plan: &str) -> Self {
        let llm = Self::new(vec![Ok(plan.to_string())]);
        llm.replies.lock().unwrap().push_back(Reply::Echo);
        llm
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.front() {
                Some(Reply::Echo) => Reply::Echo,
                _ => replies
                    .pop_front()
                    .unwrap_or_else(|| Reply::Fail(AppError::Llm("script exhausted".to_string()))),
            }
        };

        let content = match reply {
            Reply::Text(text) => text,
            Reply::Fail(e) => return Err(e),
            Reply::Echo => request
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// Fact store over a fixed map.
pub struct StaticFacts {
    records: HashMap<String, FactRecord>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticFacts {
    pub fn empty() -> Self {
        Self {
            records: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mission_name: &str, record: FactRecord) -> Self {
        Self::empty().and(mission_name, record)
    }

    pub fn and(mut self, mission_name: &str, record: FactRecord) -> Self {
        self.records.insert(mission_name.to_string(), record);
        self
    }

    /// A store whose every lookup fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FactStore for StaticFacts {
    async fn mission_facts(&self, mission_name: &str) -> AppResult<Option<FactRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Storage("fact store unavailable".to_string()));
        }
        Ok(self.records.get(mission_name).cloned())
    }
}

/// Search backend returning canned hits, optionally after a delay.
pub struct StaticSearch {
    source: String,
    hits: Vec<(String, f32)>,
    delay: Option<Duration>,
}

impl StaticSearch {
    pub fn new(source: &str, hits: &[(&str, f32)]) -> Self {
        Self {
            source: source.to_string(),
            hits: hits.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl PassageSearch for StaticSearch {
    fn source(&self) -> &str {
        &self.source
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        top_n: usize,
        _order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .hits
            .iter()
            .take(top_n)
            .map(|(text, score)| SearchHit::new(self.source.clone(), text.clone(), *score))
            .collect())
    }
}

/// Search backend that is always down.
pub struct FailingSearch {
    source: String,
}

impl FailingSearch {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PassageSearch for FailingSearch {
    fn source(&self) -> &str {
        &self.source
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _top_n: usize,
        _order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        Err(AppError::Storage(format!("{}: connection refused", self.source)))
    }
}

/// Search backend that never answers and records when it is dropped.
pub struct PendingSearch {
    dropped: Arc<AtomicBool>,
}

impl PendingSearch {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Self {
                dropped: dropped.clone(),
            },
            dropped,
        )
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PassageSearch for PendingSearch {
    fn source(&self) -> &str {
        "pending"
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _top_n: usize,
        _order: ScoreOrder,
    ) -> AppResult<Vec<SearchHit>> {
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

/// Embedder whose service is unreachable.
#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        Err(AppError::Embedding(
            "embedding service unreachable".to_string(),
        ))
    }
}
