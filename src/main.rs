//! Binary entry point for vectorvault.
//!
//! Operator CLI over a configured vector store: inspect, verify, search,
//! export/import and migrate between backends.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vectorvault::StoreConfig;
use vectorvault::observability::{self, LogFormat, LoggingConfig};

use commands::{
    cmd_config, cmd_export, cmd_import, cmd_migrate, cmd_optimize, cmd_search, cmd_stats,
    cmd_verify,
};

/// Vectorvault - pluggable vector storage for semantic retrieval.
#[derive(Parser)]
#[command(name = "vectorvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "VECTORVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show store statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the integrity scan.
    Verify {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run backend housekeeping (compaction, vacuum, analyze).
    Optimize,

    /// Write every entry to an interchange JSON file.
    Export {
        /// Output file (`-` for stdout).
        file: PathBuf,
    },

    /// Upsert every entry of an interchange JSON file.
    Import {
        /// Input file.
        file: PathBuf,
    },

    /// Rank stored entries against a query embedding.
    Search {
        /// Query embedding as comma-separated floats.
        #[arg(long, allow_hyphen_values = true)]
        vector: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Minimum similarity score.
        #[arg(short, long, default_value = "0.0", allow_hyphen_values = true)]
        threshold: f32,

        /// Metadata filter `field=value` (repeatable; repeated fields are OR-ed).
        #[arg(short, long)]
        filter: Vec<String>,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Copy every entry into the store described by another config file.
    Migrate {
        /// Target store configuration (TOML).
        #[arg(long)]
        to: PathBuf,

        /// Remove everything from the target first.
        #[arg(long)]
        clear_target: bool,

        /// Entries per batch.
        #[arg(long, default_value = "100")]
        batch_size: usize,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if cli.log_json {
        logging = logging.with_format(LogFormat::Json);
    }
    if let Err(e) = observability::init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match StoreConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: StoreConfig) -> anyhow::Result<()> {
    match command {
        Commands::Stats { json } => cmd_stats(&config, json).await,
        Commands::Verify { json } => cmd_verify(&config, json).await,
        Commands::Optimize => cmd_optimize(&config).await,
        Commands::Export { file } => cmd_export(&config, &file).await,
        Commands::Import { file } => cmd_import(&config, &file).await,
        Commands::Search {
            vector,
            top_k,
            threshold,
            filter,
            json,
        } => cmd_search(&config, &vector, top_k, threshold, &filter, json).await,
        Commands::Migrate {
            to,
            clear_target,
            batch_size,
        } => cmd_migrate(&config, &to, clear_target, batch_size).await,
        Commands::Config { show } => cmd_config(&config, show),
    }
}
