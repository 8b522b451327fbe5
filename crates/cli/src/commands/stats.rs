//! Stats command handler.
//!
//! Shows what the evidence store holds.

use super::print_json;
use catalyst_core::{config::AppConfig, AppResult};
use catalyst_rag::SqliteStore;
use clap::Args;

/// Show evidence store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let path = config.database_path();
        let stats = SqliteStore::open(&path)?.stats()?;

        if self.json {
            return print_json(&stats);
        }

        println!("Database:  {}", path.display());
        println!("Facts:     {}", stats.facts);
        println!("Chunks:    {}", stats.chunks);
        println!(
            "Comments:  {} ({} embedded)",
            stats.comments, stats.embedded_comments
        );
        Ok(())
    }
}
