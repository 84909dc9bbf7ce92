//! NEXUS Dupes - find copy-pasted components before they spread
//!
//! Command-line front end for indexing a project and checking files against
//! its duplicate index.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use nexus_dupes::config;

mod cli;

/// NEXUS Dupes - semantic duplicate detection
#[derive(Parser)]
#[command(name = "nexus-dupes")]
#[command(author = "Mustafa Saraç <mustafa@mustafasarac.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Semantic duplicate detection for components, hooks and markup", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the duplicate index for a project
    Index {
        /// Project root (defaults to current directory)
        path: Option<String>,
    },

    /// Check files against the duplicate index
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<String>,

        /// Project root holding the index
        #[arg(short, long, default_value = ".")]
        root: String,

        /// Minimum similarity (0.0 - 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Print findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find chunks similar to an indexed chunk
    Query {
        /// Chunk id
        chunk_id: String,

        /// Project root holding the index
        #[arg(short, long, default_value = ".")]
        root: String,

        /// Minimum similarity (0.0 - 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the chunks a file is split into
    Chunks {
        /// Source file
        file: String,
    },

    /// Show index statistics
    Stats {
        /// Project root (defaults to current directory)
        path: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;
    config.verbose = cli.verbose;

    debug!("NEXUS Dupes v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Index { path } => {
            cli::index::run(config, path.as_deref()).await?;
        }
        Commands::Check { files, root, threshold, json } => {
            cli::check::run(config, &files, &root, threshold, json)?;
        }
        Commands::Query { chunk_id, root, threshold, limit } => {
            cli::query::run(config, &chunk_id, &root, threshold, limit)?;
        }
        Commands::Chunks { file } => {
            cli::chunks::run(config, &file)?;
        }
        Commands::Stats { path } => {
            cli::stats::run(config, path.as_deref())?;
        }
        Commands::Config { show, init } => {
            if init {
                config::init_config(cli.config.as_deref())?;
            } else if show {
                config::show_config(&config)?;
            } else {
                println!("Use --show to print the configuration or --init to create it");
            }
        }
    }

    Ok(())
}
