//! Prompt system for Catalyst.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in or overridden per workspace
//! - Handlebars template rendering with HTML escaping disabled
//! - The planner and synthesizer prompts used by the query pipeline

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{PassageView, PlannerContext, PromptLibrary, SynthesizerContext};
pub use loader::{
    builtin_prompt, list_prompts, load_prompt, PLANNER_PROMPT_ID, SYNTHESIZER_PROMPT_ID,
};
pub use types::{OutputFormat, PromptDefinition, PromptOrigin, PromptOutputSpec, PromptSummary};
