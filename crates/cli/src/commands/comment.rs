//! Comment command handler.

use super::print_json;
use catalyst_core::{config::AppConfig, AppResult};
use catalyst_llm::http_client;
use catalyst_rag::{add_comment, create_provider, SqliteStore};
use clap::{Args, Subcommand};

/// Add or list comments on a mission item
#[derive(Args, Debug)]
pub struct CommentCommand {
    #[command(subcommand)]
    pub action: CommentAction,
}

#[derive(Subcommand, Debug)]
pub enum CommentAction {
    /// Store a comment and make it searchable
    Add {
        /// Item the comment belongs to
        item_id: String,

        /// Comment text
        text: String,

        /// Author of the comment
        #[arg(long, env = "USER", default_value = "anonymous")]
        user: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List comments on an item, oldest first
    List {
        /// Item to list comments for
        item_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl CommentCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = SqliteStore::open(&config.database_path())?;

        match &self.action {
            CommentAction::Add {
                item_id,
                text,
                user,
                json,
            } => {
                tracing::info!("Adding comment to '{}'", item_id);
                let embedder = create_provider(config, http_client(config.request_timeout())?)?;
                let receipt = add_comment(&store, embedder.as_ref(), item_id, user, text).await?;

                if *json {
                    print_json(&receipt)
                } else {
                    println!("Saved comment {}", receipt.comment.id);
                    if !receipt.embedded {
                        println!("Embedding failed; the comment is not searchable yet");
                    }
                    Ok(())
                }
            }

            CommentAction::List { item_id, json } => {
                let comments = store.list_comments(item_id)?;

                if *json {
                    return print_json(&comments);
                }

                if comments.is_empty() {
                    println!("No comments on '{}'", item_id);
                }
                for comment in comments {
                    println!(
                        "[{}] {}: {}{}",
                        comment.created_at.format("%Y-%m-%d %H:%M"),
                        comment.user_id,
                        comment.comment,
                        if comment.embedded { "" } else { " (not indexed)" }
                    );
                }
                Ok(())
            }
        }
    }
}
