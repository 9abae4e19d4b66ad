//! Multiquery CLI
//!
//! Main entry point for the multiquery command-line tool.
//! Answers questions from a vector index using query decomposition or
//! multi-query expansion.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ExpandCommand, PromptsCommand, SearchCommand};
use multiquery_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Multiquery - retrieval-augmented answers with query expansion
#[derive(Parser, Debug)]
#[command(name = "multiquery")]
#[command(about = "Retrieval-augmented answers with query expansion", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MULTIQUERY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MULTIQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true, env = "MULTIQUERY_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "MULTIQUERY_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the index
    Ask(AskCommand),

    /// Show how a question expands into search queries
    Expand(ExpandCommand),

    /// Run a single search against the index
    Search(SearchCommand),

    /// List available prompt templates
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Multiquery CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Expand(_) => "expand",
        Commands::Search(_) => "search",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Expand(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) if e.is_fatal_external() => tracing::error!("Request failed: {}", e),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
