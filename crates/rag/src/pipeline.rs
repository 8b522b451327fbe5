//! End-to-end hybrid query orchestration.
//!
//! `Received -> Planning -> Retrieving -> Synthesizing -> Answered`, with
//! `Failed` reachable from any working state. Each model or backend call is
//! attempted once; there is no retry.

use crate::embeddings::create_provider;
use crate::executor::{RetrievalSettings, ToolExecutor};
use crate::index::{CommentSearch, KnowledgeSearch, SqliteStore};
use crate::planner::Planner;
use crate::sources::PassageSearch;
use crate::synthesizer::Synthesizer;
use crate::types::{EvidenceBundle, ExecutionPlan};
use catalyst_core::{AppConfig, AppError, AppResult};
use catalyst_llm::{create_client, http_client, Sampling};
use catalyst_prompt::PromptLibrary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Stage of the pipeline a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Planning,
    Retrieving,
    Synthesizing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Planning => "planning",
            Stage::Retrieving => "retrieving",
            Stage::Synthesizing => "synthesizing",
        };
        f.write_str(name)
    }
}

/// Orchestration state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Planning,
    Retrieving,
    Synthesizing,
    Answered,
    Failed(Stage),
}

/// A fatal pipeline failure.
///
/// `source` carries the full diagnostic and is for server-side logs only;
/// callers see `public_message()`.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct QueryError {
    pub stage: Stage,
    #[source]
    pub source: AppError,
}

impl QueryError {
    pub fn new(stage: Stage, source: AppError) -> Self {
        Self { stage, source }
    }

    /// HTTP-equivalent status class.
    pub fn status_code(&self) -> u16 {
        match self.stage {
            Stage::Input => 400,
            _ => 500,
        }
    }

    /// Fixed caller-facing message for the failed stage.
    pub fn public_message(&self) -> &'static str {
        match self.stage {
            Stage::Input => "form value 'question' is required",
            Stage::Planning => "Error planning query",
            Stage::Retrieving => "Error executing plan",
            Stage::Synthesizing => "Error synthesizing answer",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.public_message().to_string(),
            status: self.status_code(),
        }
    }
}

/// Successful caller-facing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
}

/// Failed caller-facing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

/// Everything observable about one run, for callers that want more than
/// the answer.
#[derive(Debug)]
pub struct QueryRun {
    pub request_id: String,
    pub states: Vec<PipelineState>,
    pub plan: Option<ExecutionPlan>,
    pub synthesis_prompt: Option<String>,
    pub result: Result<QueryAnswer, QueryError>,
}

impl QueryRun {
    pub fn final_state(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Received)
    }
}

struct Tracker {
    states: Vec<PipelineState>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Received],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.states.last(), to = ?next, "State transition");
        self.states.push(next);
    }

    fn fail(&mut self, stage: Stage, source: AppError) -> QueryError {
        tracing::error!(stage = %stage, error = %source, "Query failed");
        self.advance(PipelineState::Failed(stage));
        QueryError::new(stage, source)
    }
}

/// Plan, retrieve, synthesize.
///
/// Built once at startup and shared read-only across requests.
pub struct HybridQueryEngine {
    planner: Planner,
    executor: ToolExecutor,
    synthesizer: Synthesizer,
}

impl HybridQueryEngine {
    pub fn new(planner: Planner, executor: ToolExecutor, synthesizer: Synthesizer) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
        }
    }

    /// Wire the engine from configuration: one shared HTTP client, the
    /// configured model provider, prompts and the SQLite evidence store.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = Arc::new(SqliteStore::open(&config.database_path())?);
        Self::from_config_with_store(config, store)
    }

    pub fn from_config_with_store(config: &AppConfig, store: Arc<SqliteStore>) -> AppResult<Self> {
        let timeout = config.request_timeout();
        let http = http_client(timeout)?;

        let llm = create_client(
            &config.provider,
            config.llm_endpoint.as_deref(),
            config.api_key.as_deref(),
            http.clone(),
        )?;
        let prompts = Arc::new(PromptLibrary::load(&config.prompts_dir())?);
        let embedder = create_provider(config, http)?;

        let backends: Vec<Arc<dyn PassageSearch>> = vec![
            Arc::new(KnowledgeSearch(store.clone())),
            Arc::new(CommentSearch(store.clone())),
        ];

        let settings = RetrievalSettings {
            call_timeout: timeout,
            search_top_n: config.search_top_n,
            max_passages: config.max_passages,
            score_order: config.score_order,
        };

        tracing::debug!(
            provider = llm.provider_name(),
            model = %config.model,
            embedding = embedder.provider_name(),
            "Hybrid query engine ready"
        );

        let sampling = Sampling {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        Ok(Self::new(
            Planner::new(llm.clone(), prompts.clone(), &config.model, timeout)
                .with_sampling(sampling),
            ToolExecutor::new(store, embedder, backends, settings),
            Synthesizer::new(llm, prompts, &config.model, timeout).with_sampling(sampling),
        ))
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Answer `question`.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        self.run(question).await.result
    }

    /// Answer `question`, keeping the state trace and intermediate artifacts.
    ///
    /// Dropping the returned future cancels every outstanding sub-call.
    pub async fn run(&self, question: &str) -> QueryRun {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("hybrid_query", request_id = %request_id);

        async move {
            let mut tracker = Tracker::new();
            let mut plan = None;
            let mut synthesis_prompt = None;

            let result = self
                .drive(question, &mut tracker, &mut plan, &mut synthesis_prompt)
                .await;

            QueryRun {
                request_id,
                states: tracker.states,
                plan,
                synthesis_prompt,
                result,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        question: &str,
        tracker: &mut Tracker,
        plan_out: &mut Option<ExecutionPlan>,
        prompt_out: &mut Option<String>,
    ) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(tracker.fail(
                Stage::Input,
                AppError::Input("form value 'question' is required".to_string()),
            ));
        }

        tracker.advance(PipelineState::Planning);
        let plan = match self.planner.plan(question).await {
            Ok(plan) => plan,
            Err(e) => return Err(tracker.fail(Stage::Planning, e)),
        };
        *plan_out = Some(plan.clone());

        tracker.advance(PipelineState::Retrieving);
        let mut bundle = EvidenceBundle::new();
        if let Err(e) = self.executor.execute_into(&plan, &mut bundle).await {
            return Err(tracker.fail(Stage::Retrieving, e));
        }

        tracker.advance(PipelineState::Synthesizing);
        let prompt = match self.synthesizer.render_prompt(question, &bundle) {
            Ok(prompt) => prompt,
            Err(e) => return Err(tracker.fail(Stage::Synthesizing, e)),
        };
        *prompt_out = Some(prompt.clone());
        let answer = match self.synthesizer.complete(prompt).await {
            Ok(answer) => answer,
            Err(e) => return Err(tracker.fail(Stage::Synthesizing, e)),
        };

        tracker.advance(PipelineState::Answered);
        Ok(QueryAnswer { answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_and_public_messages() {
        let input = QueryError::new(Stage::Input, AppError::Input("empty".to_string()));
        assert_eq!(input.status_code(), 400);
        assert_eq!(input.public_message(), "form value 'question' is required");

        let synth = QueryError::new(
            Stage::Synthesizing,
            AppError::Synthesis("status 500: internal stack trace".to_string()),
        );
        assert_eq!(synth.status_code(), 500);
        let body = serde_json::to_string(&synth.to_response()).unwrap();
        assert_eq!(body, r#"{"error":"Error synthesizing answer","status":500}"#);
        assert!(!body.contains("stack trace"));
    }

    #[test]
    fn test_every_fatal_stage_is_server_error() {
        for stage in [Stage::Planning, Stage::Retrieving, Stage::Synthesizing] {
            let err = QueryError::new(stage, AppError::Other("x".to_string()));
            assert_eq!(err.status_code(), 500);
        }
    }
}
