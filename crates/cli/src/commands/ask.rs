//! Ask command handler.
//!
//! Runs the full plan, retrieve, synthesize pipeline for one question.

use super::print_json;
use catalyst_core::{config::AppConfig, AppError, AppResult};
use catalyst_rag::HybridQueryEngine;
use clap::Args;

/// Answer a question from mission facts and narrative context
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let engine = HybridQueryEngine::from_config(config)?;
        let run = engine.run(&self.question).await;

        tracing::debug!(
            request_id = %run.request_id,
            states = ?run.states,
            "Query finished"
        );

        match run.result {
            Ok(answer) => {
                if self.json {
                    print_json(&answer)?;
                } else {
                    println!("{}", answer.answer);
                }
                Ok(())
            }
            Err(e) => {
                let response = e.to_response();
                print_json(&response)?;
                Err(AppError::Other(format!(
                    "{} (status {})",
                    response.error, response.status
                )))
            }
        }
    }
}
