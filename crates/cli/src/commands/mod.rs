//! Command handlers for the Catalyst CLI.

pub mod ask;
pub mod comment;
pub mod ingest;
pub mod plan;
pub mod prompts;
pub mod stats;

pub use ask::AskCommand;
pub use comment::CommentCommand;
pub use ingest::IngestCommand;
pub use plan::PlanCommand;
pub use prompts::PromptsCommand;
pub use stats::StatsCommand;

use catalyst_core::{AppError, AppResult};
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
