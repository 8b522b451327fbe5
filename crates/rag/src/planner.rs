//! Planning: ask the model which retrieval tools to run.

use crate::timeout::with_timeout;
use crate::types::ExecutionPlan;
use catalyst_core::{AppError, AppResult};
use catalyst_llm::{LlmClient, LlmRequest, ResponseMode, Sampling};
use catalyst_prompt::PromptLibrary;
use std::sync::Arc;
use std::time::Duration;

/// Issues the planning call and parses its JSON output.
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    timeout: Duration,
    sampling: Sampling,
}

impl Planner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            prompts,
            model: model.into(),
            timeout,
            sampling: Sampling::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Render the planning prompt for `question`.
    pub fn render_prompt(&self, question: &str) -> AppResult<String> {
        self.prompts.render_planner(question)
    }

    /// Produce a syntactically valid plan for `question`.
    ///
    /// Tool names and arguments are not checked here; see `tools::resolve_plan`.
    pub async fn plan(&self, question: &str) -> AppResult<ExecutionPlan> {
        let prompt = self.render_prompt(question)?;
        let request = LlmRequest::new(prompt, &self.model)
            .with_mode(ResponseMode::Json)
            .with_sampling(self.sampling);

        let response =
            with_timeout(self.timeout, "planning call", self.llm.complete(&request)).await?;

        let plan = parse_plan(&response.content)?;
        tracing::info!(tool_calls = plan.len(), "Received execution plan");
        Ok(plan)
    }
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = ["json", "JSON", "Json"]
        .iter()
        .find_map(|tag| rest.strip_prefix(tag))
        .unwrap_or(rest);

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse planner output into a plan. Failures keep the raw text.
pub fn parse_plan(raw: &str) -> AppResult<ExecutionPlan> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| AppError::PlanParse {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}
