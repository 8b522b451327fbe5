//! Ingest command handler.
//!
//! Loads mission facts and knowledge chunks into the evidence store.

use super::print_json;
use catalyst_core::{config::AppConfig, AppResult};
use catalyst_llm::http_client;
use catalyst_rag::{create_provider, ingest_chunks_file, ingest_facts_file, SqliteStore};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Load evidence into the store
#[derive(Args, Debug)]
pub struct IngestCommand {
    #[command(subcommand)]
    pub action: IngestAction,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum IngestAction {
    /// Upsert mission fact records from a JSON array file
    Facts {
        /// File holding an array of records, each with `mission_name`
        file: PathBuf,
    },

    /// Embed and store knowledge chunks from a JSON array file
    Chunks {
        /// File holding an array of `{mission_name, text}` objects
        file: PathBuf,
    },
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = SqliteStore::open(&config.database_path())?;

        let (kind, stats) = match &self.action {
            IngestAction::Facts { file } => {
                tracing::info!("Ingesting mission facts from {:?}", file);
                ("facts", ingest_facts_file(&store, file)?)
            }
            IngestAction::Chunks { file } => {
                tracing::info!("Ingesting knowledge chunks from {:?}", file);
                let embedder = create_provider(config, http_client(config.request_timeout())?)?;
                ("chunks", ingest_chunks_file(&store, embedder.as_ref(), file).await?)
            }
        };

        if self.json {
            print_json(&serde_json::json!({
                "kind": kind,
                "stored": stats.stored,
                "skipped": stats.skipped,
            }))
        } else {
            println!("Stored {} {} ({} skipped)", stats.stored, kind, stats.skipped);
            Ok(())
        }
    }
}
