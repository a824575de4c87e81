//! Delegation Sync CLI
//!
//! Runs the delegation sync service and inspects its store.
//!
//! # Commands
//!
//! - `run` - Sync continuously until interrupted
//! - `sync-once` - Catch up with the feed, then exit
//! - `query` - Print a page of stored delegations
//! - `status` - Show store statistics

mod commands;

use clap::{Parser, Subcommand};
use delegation_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use delegation_sync_engine::{SyncConfig, DEFAULT_FEED_URL};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Tezos delegation sync service.
#[derive(Debug, Parser)]
#[command(name = "delegation-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database
    #[arg(
        global = true,
        short,
        long = "db",
        env = "DELEGATION_DB_PATH",
        default_value = "delegations.db"
    )]
    db: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sync continuously until interrupted
    Run {
        /// Delegation feed endpoint
        #[arg(long, env = "DELEGATION_FEED_URL", default_value = DEFAULT_FEED_URL)]
        feed_url: String,

        /// Seconds between steady-state polls
        #[arg(long, env = "DELEGATION_POLL_INTERVAL_SECS", default_value_t = 60)]
        poll_interval_secs: u64,

        /// Seconds to wait for the engine to stop on shutdown
        #[arg(long, env = "DELEGATION_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
        shutdown_timeout_secs: u64,
    },

    /// Catch up with the feed, then exit
    SyncOnce {
        /// Delegation feed endpoint
        #[arg(long, env = "DELEGATION_FEED_URL", default_value = DEFAULT_FEED_URL)]
        feed_url: String,
    },

    /// Print a page of stored delegations, newest first
    Query {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: i64,

        /// Records per page
        #[arg(short = 's', long, default_value_t = DEFAULT_PAGE_SIZE,
              value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_SIZE))]
        page_size: i64,

        /// Only delegations from this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Show store statistics
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            feed_url,
            poll_interval_secs,
            shutdown_timeout_secs,
        } => {
            let config = SyncConfig::new(feed_url)
                .with_poll_interval(Duration::from_secs(poll_interval_secs));
            commands::run::run(&cli.db, config, Duration::from_secs(shutdown_timeout_secs))
                .await?;
        }
        Commands::SyncOnce { feed_url } => {
            commands::sync_once::run(&cli.db, SyncConfig::new(feed_url)).await?;
        }
        Commands::Query {
            page,
            page_size,
            year,
            format,
        } => {
            commands::query::run(&cli.db, page, page_size, year, &format).await?;
        }
        Commands::Status { format } => {
            commands::status::run(&cli.db, &format).await?;
        }
    }

    Ok(())
}
