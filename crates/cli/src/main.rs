//! Slotwise CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive consultation session
//! - `turn`: Process one utterance and print the outcome as JSON
//! - `config`: Show, validate or print the default configuration
//! - `doctor`: Check the scenario graph and slot table

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod responder;

#[derive(Parser)]
#[command(
    name = "slotwise",
    about = "Slotwise — slot-filling dialog engine for legal consultation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.slotwise/config.toml
    #[arg(short, long, global = true, env = "SLOTWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive consultation
    Chat,

    /// Process a single utterance and print the outcome as JSON
    Turn {
        /// The user's utterance
        #[arg(short, long)]
        message: String,

        /// Dialog memory snapshot to resume from; rewritten after the turn
        #[arg(long)]
        memory: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check the scenario graph and slot table
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Print the default configuration
    Default,
    /// Validate the configuration and the tables it points to
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Turn { message, memory } => {
            commands::turn::run(config_path, &message, memory.as_deref()).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Default => commands::config_cmd::default().await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
        },
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
