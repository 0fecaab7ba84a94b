//! artcov - article coverage scoring tool
//!
//! Creates, scores, edits and exports article/subject coverage documents.

use anyhow::{Context, Result};
use artcov_common::config::{AppConfig, ConfigResolver, LoggingConfig};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{EditArgs, ExportArgs, InitArgs, ScoreArgs};

#[derive(Parser, Debug)]
#[command(name = "artcov")]
#[command(about = "Score how well articles cover an ordered sequence of subjects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a document with default appearance placement
    Init(InitArgs),

    /// Print the score grid and C_nu for a document
    Score(ScoreArgs),

    /// Apply edits to a document and write the result
    Edit(EditArgs),

    /// Export a document as JSON or CSV
    Export(ExportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigResolver::new(cli.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&config.logging, cli.log_level.as_deref())?;

    info!(
        "Starting artcov v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    run(cli.command, &config)
}

fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Init(args) => commands::init(args),
        Commands::Score(args) => commands::score(args, config),
        Commands::Edit(args) => commands::edit(args, config),
        Commands::Export(args) => commands::export(args, config),
    }
}

/// RUST_LOG wins over the command line, which wins over the config file
fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
