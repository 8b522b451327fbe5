//! Tool execution: dispatch a plan to the evidence sources.
//!
//! Resolved calls run concurrently on the calling task. Backend failures
//! are logged and contribute nothing; only a missing required argument
//! escapes as an error, and it does so before any backend is contacted.

use crate::embeddings::EmbeddingProvider;
use crate::sources::{FactStore, PassageSearch};
use crate::timeout::with_timeout;
use crate::tools::{resolve_plan, ToolCall};
use crate::types::{EvidenceBundle, ExecutionPlan, FactKind, FactRecord, SearchHit};
use catalyst_core::{AppError, AppResult, ScoreOrder};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Retrieval limits shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalSettings {
    /// Deadline for each individual backend call
    pub call_timeout: Duration,

    /// Hits requested from each search backend
    pub search_top_n: usize,

    /// Bound on the merged passage list
    pub max_passages: usize,

    pub score_order: ScoreOrder,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            search_top_n: 5,
            max_passages: 5,
            score_order: ScoreOrder::HigherIsBetter,
        }
    }
}

/// What one tool call contributed.
#[derive(Debug)]
enum ToolOutcome {
    Fact(Option<FactRecord>),
    Passages(Vec<SearchHit>),
    Skipped,
}

pub struct ToolExecutor {
    facts: Arc<dyn FactStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    backends: Vec<Arc<dyn PassageSearch>>,
    settings: RetrievalSettings,
}

impl ToolExecutor {
    pub fn new(
        facts: Arc<dyn FactStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        backends: Vec<Arc<dyn PassageSearch>>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            facts,
            embedder,
            backends,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Execute `plan` into a fresh bundle.
    pub async fn execute(&self, plan: &ExecutionPlan) -> AppResult<EvidenceBundle> {
        let mut bundle = EvidenceBundle::new();
        self.execute_into(plan, &mut bundle).await?;
        Ok(bundle)
    }

    /// Execute `plan`, accumulating into `bundle`.
    ///
    /// Outcomes are applied in plan order, whatever order the calls finish in.
    pub async fn execute_into(
        &self,
        plan: &ExecutionPlan,
        bundle: &mut EvidenceBundle,
    ) -> AppResult<()> {
        let calls = resolve_plan(plan)?;

        let outcomes = join_all(calls.iter().map(|call| self.run(call))).await;

        for (call, outcome) in calls.iter().zip(outcomes) {
            match outcome {
                ToolOutcome::Fact(Some(record)) => {
                    if !bundle.set_fact(FactKind::Mission, record) {
                        tracing::warn!(
                            tool = call.name(),
                            "Fact slot already filled; keeping first result"
                        );
                    }
                }
                ToolOutcome::Fact(None) | ToolOutcome::Skipped => {}
                ToolOutcome::Passages(hits) => {
                    bundle.add_passages(
                        hits,
                        self.settings.score_order,
                        self.settings.max_passages,
                    );
                }
            }
        }

        tracing::debug!(
            has_facts = bundle.has_facts(),
            passages = bundle.passages().len(),
            "Plan executed"
        );

        Ok(())
    }

    async fn run(&self, call: &ToolCall) -> ToolOutcome {
        match call {
            ToolCall::MissionFacts { mission_name } => self.lookup_facts(mission_name).await,
            ToolCall::MissionContext { search_query } => self.search_context(search_query).await,
            ToolCall::Unrecognized { name } => {
                tracing::warn!(tool = %name, "Ignoring unrecognized tool");
                ToolOutcome::Skipped
            }
        }
    }

    async fn lookup_facts(&self, mission_name: &str) -> ToolOutcome {
        let result = with_timeout(
            self.settings.call_timeout,
            "mission facts lookup",
            self.facts.mission_facts(mission_name),
        )
        .await;

        match result {
            Ok(Some(record)) => {
                tracing::info!(mission_name, "Found mission facts");
                ToolOutcome::Fact(Some(record))
            }
            Ok(None) => {
                tracing::info!(mission_name, "No mission facts found");
                ToolOutcome::Fact(None)
            }
            Err(e) => {
                log_backend_failure("get_mission_facts", mission_name, "facts", &e);
                ToolOutcome::Fact(None)
            }
        }
    }

    async fn search_context(&self, search_query: &str) -> ToolOutcome {
        let embedding = match with_timeout(
            self.settings.call_timeout,
            "query embedding",
            self.embedder.embed(search_query),
        )
        .await
        {
            Ok(embedding) => embedding,
            Err(e) => {
                log_backend_failure("find_mission_context", search_query, "embedding", &e);
                return ToolOutcome::Passages(Vec::new());
            }
        };

        let searches = self.backends.iter().map(|backend| {
            let embedding = &embedding;
            async move {
                let result = with_timeout(
                    self.settings.call_timeout,
                    backend.source(),
                    backend.search(
                        embedding,
                        self.settings.search_top_n,
                        self.settings.score_order,
                    ),
                )
                .await;

                match result {
                    Ok(hits) => {
                        tracing::info!(
                            backend = backend.source(),
                            hits = hits.len(),
                            "Search complete"
                        );
                        hits
                    }
                    Err(e) => {
                        log_backend_failure(
                            "find_mission_context",
                            search_query,
                            backend.source(),
                            &e,
                        );
                        Vec::new()
                    }
                }
            }
        });

        let hits = join_all(searches).await.into_iter().flatten().collect();
        ToolOutcome::Passages(hits)
    }
}

fn log_backend_failure(tool: &str, argument: &str, backend: &str, error: &AppError) {
    tracing::error!(
        tool,
        argument,
        backend,
        recoverable = error.is_recoverable(),
        error = %error,
        "Backend call failed; continuing without its contribution"
    );
}
