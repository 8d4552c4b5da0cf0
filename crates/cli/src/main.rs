//! Prism CLI
//!
//! Main entry point for the prism command-line tool: query answering over a
//! product-metrics corpus, the HTTP service, ranking-model training, and
//! stats inspection.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand, StatsCommand, TrainCommand};
use prism_core::{config::AppConfig, logging, PrismResult};
use std::path::PathBuf;

/// Prism - evidence-gated answers over product metrics documentation
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "Evidence-gated answers over product metrics documentation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PRISM_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PRISM_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the corpus file
    #[arg(long, global = true, env = "PRISM_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question from the command line
    Ask(AskCommand),

    /// Run the HTTP API service
    Serve(ServeCommand),

    /// Retrain the ranking model from logged feedback
    Train(TrainCommand),

    /// Show corpus, model, and feedback statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> PrismResult<()> {
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.corpus,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    config.validate()?;

    tracing::info!("Prism CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Corpus: {:?}", config.corpus_path);

    config.ensure_state_dirs()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Train(_) => "train",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Train(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
