//! Prompt loader for YAML prompt definitions.
//!
//! Built-in definitions are compiled into the binary. A workspace overrides
//! one by placing `<id>.yml` in its prompts directory.

use crate::types::{PromptDefinition, PromptOrigin, PromptSummary};
use catalyst_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the planning prompt.
pub const PLANNER_PROMPT_ID: &str = "planner";

/// Identifier of the synthesis prompt.
pub const SYNTHESIZER_PROMPT_ID: &str = "synthesizer";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (PLANNER_PROMPT_ID, include_str!("../prompts/planner.yml")),
    (SYNTHESIZER_PROMPT_ID, include_str!("../prompts/synthesizer.yml")),
];

/// Load the effective prompt definition for `prompt_id`.
///
/// A workspace file `<prompts_dir>/<id>.yml` wins over the built-in
/// definition of the same id.
///
/// # Example
/// ```no_run
/// use catalyst_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (prompt, origin) = load_prompt(Path::new(".catalyst/prompts"), "planner")?;
/// println!("Loaded prompt: {} ({:?})", prompt.title, origin);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(
    prompts_dir: &Path,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptOrigin)> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    if !prompt_file.is_file() {
        return Ok((builtin_prompt(prompt_id)?, PromptOrigin::Builtin));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents, prompt_id)?;

    tracing::info!("Loaded workspace prompt: {} ({})", definition.id, definition.title);

    Ok((definition, PromptOrigin::Workspace))
}

/// Load the built-in definition for `prompt_id`, ignoring any workspace file.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let yaml = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, yaml)| *yaml)
        .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)))?;

    parse_prompt(yaml, prompt_id)
}

fn parse_prompt(contents: &str, prompt_id: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML '{}': {}", prompt_id, e))
    })?;

    validate_prompt(&definition, prompt_id)?;

    Ok(definition)
}

/// List the effective prompts: every built-in plus any extra workspace file.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<PromptSummary>> {
    let mut ids: Vec<String> = BUILTIN_PROMPTS.iter().map(|(id, _)| id.to_string()).collect();

    if prompts_dir.is_dir() {
        for entry in walkdir::WalkDir::new(prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !ids.iter().any(|id| id == stem) {
                        ids.push(stem.to_string());
                    }
                }
            }
        }
    }

    ids.sort();

    ids.iter()
        .map(|id| {
            let (definition, origin) = load_prompt(prompts_dir, id)?;
            Ok(PromptSummary {
                id: definition.id,
                title: definition.title,
                origin,
                format: definition.output.format,
            })
        })
        .collect()
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition, expected_id: &str) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.id != expected_id {
        return Err(AppError::Prompt(format!(
            "Prompt ID '{}' does not match file name '{}'",
            def.id, expected_id
        )));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    for variable in &def.variables {
        if !def.template.contains(variable.as_str()) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' declares variable '{}' that its template never uses",
                def.id, variable
            )));
        }
    }

    Ok(())
}
