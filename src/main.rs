//! Sketch Store - Main entrypoint.
//!
//! This is the main entry point for the sketch store application.
//! It loads configuration, initializes the logging system, and runs the
//! selected command.

mod analyze;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sketch_store_lib::config::{self, LogConfig, SketchConfig};
use sketch_store_lib::protocol::{serve_stdio, CommandHandler};
use sketch_store_lib::store::SketchStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Command line arguments for the sketch store.
#[derive(Parser, Debug)]
#[clap(name = "sketch_store", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Serve JSON-lines requests on stdin/stdout
    Serve,

    /// Feed the words of a text file to every structure type and report
    Analyze {
        /// Text file to read
        #[clap(short, long, value_parser)]
        input: PathBuf,

        /// Number of top words to report
        #[clap(short, long, default_value_t = 10)]
        top: usize,

        /// Keep short words and stop words
        #[clap(long)]
        all_words: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Initialize the logging system.
///
/// Logs go to stderr; stdout carries protocol responses and reports.
fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("Invalid log level: {}", log.level))?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let result = if log.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(log.source_location)
                    .with_line_number(log.source_location),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(log.source_location)
                    .with_line_number(log.source_location)
                    .with_thread_names(true),
            )
            .try_init()
    };
    result.context("Failed to set global tracing subscriber")
}

/// Main entry point for the application.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = config::load_config(args.config.as_deref());
    let log_config = loaded
        .as_ref()
        .map(|config| config.log.clone())
        .unwrap_or_default();
    init_logging(&log_config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::GenConfig { output } => gen_config(&output),
        command => {
            let config = loaded.context("Configuration error")?;
            sketch_store_lib::init(config);
            let config = config::get_global_config()
                .map(|global| global.get().clone())
                .context("Global configuration not initialized")?;
            run(command, &config).await
        }
    }
}

async fn run(command: Command, config: &SketchConfig) -> Result<()> {
    match command {
        Command::Serve => serve(config).await,
        Command::Analyze {
            input,
            top,
            all_words,
        } => {
            let text = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let store = SketchStore::from_config(config);
            let options = analyze::AnalyzeOptions { top, all_words };
            let report = analyze::analyze_text(&store, &text, options)
                .with_context(|| format!("Failed to analyze {}", input.display()))?;
            print!("{report}");
            Ok(())
        }
        Command::Validate => {
            info!("Configuration validated successfully");
            Ok(())
        }
        Command::GenConfig { output } => gen_config(&output),
    }
}

async fn serve(config: &SketchConfig) -> Result<()> {
    info!(
        name = %config.server.name,
        create_policy = ?config.store.create_policy,
        shards = config.store.shard_amount,
        version = sketch_store_lib::VERSION,
        "Starting sketch store"
    );

    let store = Arc::new(SketchStore::from_config(config));
    let handler = CommandHandler::new(store);
    let stats = serve_stdio(&handler, config.server.max_line_bytes)
        .await
        .context("Server loop failed")?;

    info!(
        requests = stats.requests,
        errors = stats.errors,
        instances = handler.store().len(),
        "Sketch store stopped"
    );
    Ok(())
}

fn gen_config(output: &Path) -> Result<()> {
    info!("Generating default configuration");
    let toml = SketchConfig::default().to_toml()?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, toml).with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Default configuration written to {:?}", output);
    Ok(())
}
