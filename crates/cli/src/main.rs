//! Catalyst CLI
//!
//! Main entry point for the catalyst command-line tool: hybrid question
//! answering over mission facts, knowledge chunks and user comments.

mod commands;

use catalyst_core::{config::AppConfig, logging, AppResult, LogFormat};
use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CommentCommand, IngestCommand, PlanCommand, PromptsCommand, StatsCommand,
};
use std::path::PathBuf;

/// Catalyst - hybrid retrieval-augmented answers about missions
#[derive(Parser, Debug)]
#[command(name = "catalyst")]
#[command(about = "Hybrid retrieval-augmented answers about missions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CATALYST_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CATALYST_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite evidence store
    #[arg(long, global = true, env = "CATALYST_DATABASE")]
    database: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log output format (pretty, json)
    #[arg(long, global = true, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "CATALYST_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CATALYST_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the evidence store
    Ask(AskCommand),

    /// Show the tool calls planned for a question
    Plan(PlanCommand),

    /// Load facts or knowledge chunks
    Ingest(IngestCommand),

    /// Add or list comments
    Comment(CommentCommand),

    /// List prompt definitions
    Prompts(PromptsCommand),

    /// Show evidence store statistics
    Stats(StatsCommand),
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format '{}' (pretty, json)", s))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.database,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("Catalyst CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_catalyst_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Plan(_) => "plan",
        Commands::Ingest(_) => "ingest",
        Commands::Comment(_) => "comment",
        Commands::Prompts(_) => "prompts",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Plan(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Comment(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
