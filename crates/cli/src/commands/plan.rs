//! Plan command handler.
//!
//! Runs only the planning step and shows the tool calls it produced.

use super::print_json;
use catalyst_core::{config::AppConfig, AppError, AppResult};
use catalyst_rag::HybridQueryEngine;
use clap::Args;

/// Show the tool calls the planner would make for a question
#[derive(Args, Debug)]
pub struct PlanCommand {
    /// The question to plan for
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PlanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing plan command");
        config.validate()?;

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Input("Question cannot be empty".to_string()));
        }

        let engine = HybridQueryEngine::from_config(config)?;
        let plan = engine.planner().plan(question).await?;

        if self.json {
            return print_json(&plan);
        }

        if plan.is_empty() {
            println!("No tool calls planned");
            return Ok(());
        }

        for (i, invocation) in plan.invocations.iter().enumerate() {
            let args: Vec<String> = invocation
                .arguments
                .iter()
                .map(|(k, v)| format!("{}={:?}", k, v))
                .collect();
            println!("{}. {}({})", i + 1, invocation.name, args.join(", "));
        }

        Ok(())
    }
}
