//! Prompts command handler.

use super::print_json;
use catalyst_core::{config::AppConfig, AppResult};
use catalyst_prompt::{list_prompts, PromptOrigin};
use clap::Args;

/// List the effective prompt definitions
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts = list_prompts(&config.prompts_dir())?;

        if self.json {
            return print_json(&prompts);
        }

        for prompt in prompts {
            let origin = match prompt.origin {
                PromptOrigin::Builtin => "builtin",
                PromptOrigin::Workspace => "workspace",
            };
            println!(
                "{:<14} {:<10} {:?}  {}",
                prompt.id, origin, prompt.format, prompt.title
            );
        }
        Ok(())
    }
}
