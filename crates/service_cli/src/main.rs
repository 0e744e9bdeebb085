//! rngstream - Command Line Access to Replayable Random Streams
//!
//! This is the operational entry point for the random stream workspace.
//!
//! # Commands
//!
//! - `rngstream draw --count <n> [--sequence <id> | --restore <file>]` - Print values
//! - `rngstream inspect` - List persisted sequence files
//! - `rngstream check` - Validate configuration, data directory and credentials
//!
//! # Architecture
//!
//! As part of the **S**ervice layer, this crate wires settings, the block
//! store and a random source together behind a command-line interface.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod source;

pub use error::{CliError, Result};

use commands::draw::{DrawOptions, StartPoint};
use config::{build_config, CliArgs};

/// Replayable random stream CLI
#[derive(Parser)]
#[command(name = "rngstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML format)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory holding the sequence files
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Random source (buffered, file)
    #[arg(long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print random values, one per line
    Draw {
        /// Number of values to print
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Replay the stream of this sequence id from its start
        #[arg(short, long, conflicts_with = "restore")]
        sequence: Option<u32>,

        /// Resume from a restore point written by --save-state
        #[arg(short, long, value_name = "FILE")]
        restore: Option<PathBuf>,

        /// Write the final restore point to this file
        #[arg(long, value_name = "FILE")]
        save_state: Option<PathBuf>,
    },

    /// List persisted sequence files with their value counts
    Inspect,

    /// Check configuration, data directory and credentials
    Check,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = build_config(&CliArgs {
        config_file: cli.config.clone(),
        data_dir: cli.data_dir.clone(),
        log_level: cli.log_level.clone(),
        source: cli.source.clone(),
    })?;

    let level = if cli.verbose {
        "debug"
    } else {
        settings.log_level.as_filter_str()
    };
    init_tracing(level);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Draw {
            count,
            sequence,
            restore,
            save_state,
        } => {
            let start = match (sequence, restore) {
                (Some(sequence_id), _) => StartPoint::Sequence(sequence_id),
                (None, Some(path)) => StartPoint::Restore(path),
                (None, None) => StartPoint::NonRepeatable,
            };
            let options = DrawOptions {
                count,
                start,
                save_state,
            };
            commands::draw::run(&settings, &options, &mut io::stdout().lock())
        }
        Commands::Inspect => commands::inspect::run(&settings, &mut io::stdout().lock()),
        Commands::Check => commands::check::run(&settings),
    }
}
