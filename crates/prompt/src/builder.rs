//! Prompt rendering.
//!
//! `PromptLibrary` compiles the planner and synthesizer templates once at
//! startup. Rendering afterwards is pure and never touches the filesystem.

use crate::loader::{builtin_prompt, load_prompt, PLANNER_PROMPT_ID, SYNTHESIZER_PROMPT_ID};
use crate::types::{OutputFormat, PromptDefinition};
use catalyst_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

/// Variables for the planning prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerContext<'a> {
    pub user_question: &'a str,
}

/// One ranked passage as shown to the synthesis model.
#[derive(Debug, Clone, Serialize)]
pub struct PassageView<'a> {
    /// 1-based rank after merging
    pub rank: usize,
    pub source: &'a str,
    pub text: &'a str,
}

/// Variables for the synthesis prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizerContext<'a> {
    pub user_question: &'a str,

    /// Pretty-printed structured facts; `None` renders the "no data" branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<String>,

    pub narrative_passages: Vec<PassageView<'a>>,
}

/// Pre-compiled planner and synthesizer templates.
pub struct PromptLibrary {
    registry: Handlebars<'static>,
    planner: PromptDefinition,
    synthesizer: PromptDefinition,
}

impl PromptLibrary {
    /// Load the effective definitions, honouring workspace overrides.
    pub fn load(prompts_dir: &Path) -> AppResult<Self> {
        let (planner, _) = load_prompt(prompts_dir, PLANNER_PROMPT_ID)?;
        let (synthesizer, _) = load_prompt(prompts_dir, SYNTHESIZER_PROMPT_ID)?;
        Self::from_definitions(planner, synthesizer)
    }

    /// Use only the definitions compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        Self::from_definitions(
            builtin_prompt(PLANNER_PROMPT_ID)?,
            builtin_prompt(SYNTHESIZER_PROMPT_ID)?,
        )
    }

    /// Compile the given definitions.
    ///
    /// The planner must ask for JSON output and the synthesizer for text.
    pub fn from_definitions(
        planner: PromptDefinition,
        synthesizer: PromptDefinition,
    ) -> AppResult<Self> {
        expect_format(&planner, OutputFormat::Json)?;
        expect_format(&synthesizer, OutputFormat::Text)?;

        let mut registry = Handlebars::new();

        // Disable HTML escaping for plain text
        registry.register_escape_fn(handlebars::no_escape);

        for def in [&planner, &synthesizer] {
            registry
                .register_template_string(&def.id, &def.template)
                .map_err(|e| {
                    AppError::Prompt(format!("Failed to register template '{}': {}", def.id, e))
                })?;
        }

        Ok(Self {
            registry,
            planner,
            synthesizer,
        })
    }

    /// Render the planning prompt for `question`.
    pub fn render_planner(&self, question: &str) -> AppResult<String> {
        self.render(
            &self.planner.id,
            &PlannerContext {
                user_question: question,
            },
        )
    }

    /// Render the synthesis prompt.
    pub fn render_synthesizer(&self, context: &SynthesizerContext<'_>) -> AppResult<String> {
        self.render(&self.synthesizer.id, context)
    }

    pub fn planner(&self) -> &PromptDefinition {
        &self.planner
    }

    pub fn synthesizer(&self) -> &PromptDefinition {
        &self.synthesizer
    }

    fn render<T: Serialize>(&self, id: &str, data: &T) -> AppResult<String> {
        self.registry
            .render(id, data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", id, e)))
    }
}

fn expect_format(def: &PromptDefinition, expected: OutputFormat) -> AppResult<()> {
    if def.output.format != expected {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' must declare output format {:?}, found {:?}",
            def.id, expected, def.output.format
        )));
    }
    Ok(())
}
