//! Synthesis: turn the question plus gathered evidence into an answer.

use crate::timeout::with_timeout;
use crate::types::EvidenceBundle;
use catalyst_core::{AppError, AppResult};
use catalyst_llm::{LlmClient, LlmRequest, ResponseMode, Sampling};
use catalyst_prompt::{PassageView, PromptLibrary, SynthesizerContext};
use std::sync::Arc;
use std::time::Duration;

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    timeout: Duration,
    sampling: Sampling,
}

impl Synthesizer {
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

    /// Render the synthesis prompt. Pure: same inputs give the same bytes.
    pub fn render_prompt(&self, question: &str, bundle: &EvidenceBundle) -> AppResult<String> {
        let context = SynthesizerContext {
            user_question: question,
            structured_data: bundle.structured_data()?,
            narrative_passages: bundle
                .passages()
                .iter()
                .enumerate()
                .map(|(i, hit)| PassageView {
                    rank: i + 1,
                    source: &hit.source,
                    text: &hit.text,
                })
                .collect(),
        };

        self.prompts.render_synthesizer(&context)
    }

    /// Ask the model for the final answer in plain-text mode.
    ///
    /// Any model-call failure, including a response without choices,
    /// surfaces as `AppError::Synthesis`.
    pub async fn synthesize(&self, question: &str, bundle: &EvidenceBundle) -> AppResult<String> {
        let prompt = self.render_prompt(question, bundle)?;
        self.complete(prompt).await
    }

    /// Send an already rendered synthesis prompt.
    pub async fn complete(&self, prompt: String) -> AppResult<String> {
        let request = LlmRequest::new(prompt, &self.model)
            .with_mode(ResponseMode::Text)
            .with_sampling(self.sampling);

        let response = with_timeout(self.timeout, "synthesis call", self.llm.complete(&request))
            .await
            .map_err(|e| AppError::Synthesis(e.to_string()))?;

        tracing::info!(
            chars = response.content.len(),
            completion_tokens = response.usage.completion_tokens,
            "Synthesized answer"
        );

        Ok(response.content)
    }
}
