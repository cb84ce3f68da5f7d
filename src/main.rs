//! # Gherkin Sync CLI (`gsync`)
//!
//! ## Usage
//!
//! ```bash
//! export GSYNC_API_TOKEN=...
//! gsync push --project 42
//! gsync push --project 42 --api-url https://tests.example.com/api --dry-run
//! gsync status
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gherkin_sync::config::{self, Overrides, Settings};
use gherkin_sync::progress::ProgressMode;
use gherkin_sync::sync;

/// Synchronize Gherkin feature files with a remote test-management service.
#[derive(Parser)]
#[command(name = "gsync", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./gsync.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Verbose logging, including the full delta before submission.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the delta since the last sync and submit it.
    ///
    /// Reads the API token from the environment variable named by
    /// `api.token_env` (default `GSYNC_API_TOKEN`).
    Push {
        /// Remote project identifier.
        #[arg(long, value_parser = config::parse_project_id)]
        project: i64,

        /// Base URL of the service API, overriding `api.base_url`.
        #[arg(long)]
        api_url: Option<String>,

        /// Print the delta as JSON instead of submitting it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show spec files with uncommitted changes. These are not synced.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let cfg = config::load_config_or_default(&config_path, explicit)?;

    match cli.command {
        Commands::Push {
            project,
            api_url,
            dry_run,
        } => {
            let settings = Settings::resolve(
                &cfg,
                project,
                Overrides {
                    api_url,
                    dry_run,
                    debug: cli.debug,
                },
                config::token_from_env(&cfg),
            )?;
            let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
            sync::run_sync(&settings, progress).await?;
        }
        Commands::Status => {
            sync::run_status(&cfg.sync.extension)?;
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
