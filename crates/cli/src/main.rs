//! Shopify Backup CLI - daily incremental backup of a Shopify store.
//!
//! # Usage
//!
//! ```bash
//! # Create the warehouse schema and tables
//! shopify-backup setup
//!
//! # Pull the store into the sync document
//! shopify-backup sync --days-back 3
//!
//! # Load the sync document into the warehouse
//! shopify-backup load
//!
//! # Both, as the daily job does
//! shopify-backup run
//!
//! # Re-sync a year of orders
//! shopify-backup run --backfill
//! ```
//!
//! # Commands
//!
//! - `setup` - Create schema, dimension, staging and backup tables
//! - `sync` - Products, locations, inventory and orders to the sync document
//! - `load` - Refresh dimensions, stage and merge facts
//! - `run` - `sync` then `load`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopify_backup_pipeline::PipelineError;
use shopify_backup_pipeline::config::SyncSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Days of orders re-synced by `--backfill`.
const BACKFILL_DAYS: u32 = 365;

#[derive(Debug, Parser)]
#[command(name = "shopify-backup")]
#[command(author, version, about = "Daily Shopify to warehouse backup")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the warehouse schema and every table
    Setup,
    /// Sync Shopify into the sync document
    Sync(SyncArgs),
    /// Load the sync document into the warehouse
    Load {
        /// Sync document to read (default: `SYNC_DATA_PATH` or `sync_data.json`)
        #[arg(long)]
        data_path: Option<PathBuf>,
    },
    /// Sync, then load
    Run(SyncArgs),
}

#[derive(Debug, Clone, Default, Args)]
struct SyncArgs {
    /// Days of orders to sync (default: `SHOPIFY_ORDERS_DAYS_BACK` or 14)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    days_back: Option<u32>,

    /// Sync a year of orders
    #[arg(long, conflicts_with = "days_back")]
    backfill: bool,

    /// Sync document to write (default: `SYNC_DATA_PATH` or `sync_data.json`)
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Fail on GraphQL errors instead of ending the resource
    #[arg(long)]
    abort_on_query_error: bool,
}

impl SyncArgs {
    /// Overlay the flags onto settings read from the environment.
    fn apply(&self, mut settings: SyncSettings) -> SyncSettings {
        if self.backfill {
            settings.orders_days_back = BACKFILL_DAYS;
        } else if let Some(days_back) = self.days_back {
            settings.orders_days_back = days_back;
        }
        if let Some(path) = &self.data_path {
            settings.data_path.clone_from(path);
        }
        settings.abort_on_query_error |= self.abort_on_query_error;
        settings
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopify_backup_pipeline=info,shopify_backup_cli=info".into());

    // JSON for the scheduler's log collector, text locally
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(stage = e.stage(), "Command failed: {e}");
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    match cli.command {
        Commands::Setup => commands::setup().await?,
        Commands::Sync(args) => {
            let settings = args.apply(SyncSettings::from_env()?);
            commands::sync(&settings).await?;
        }
        Commands::Load { data_path } => {
            let settings = SyncSettings::from_env()?;
            commands::load(data_path.as_deref().unwrap_or(&settings.data_path)).await?;
        }
        Commands::Run(args) => {
            let settings = args.apply(SyncSettings::from_env()?);
            let document = commands::sync(&settings).await?;
            commands::load_document(&document).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("shopify-backup").chain(args.iter().copied()))
    }

    fn sync_args(args: &[&str]) -> SyncArgs {
        match parse(args).unwrap().command {
            Commands::Sync(args) | Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let args = sync_args(&["sync", "--days-back", "3", "--data-path", "/tmp/doc.json"]);
        let settings = args.apply(SyncSettings::default());

        assert_eq!(settings.orders_days_back, 3);
        assert_eq!(settings.data_path, PathBuf::from("/tmp/doc.json"));
        assert!(!settings.abort_on_query_error);
    }

    #[test]
    fn test_backfill_syncs_a_year() {
        let settings = sync_args(&["run", "--backfill"]).apply(SyncSettings::default());
        assert_eq!(settings.orders_days_back, BACKFILL_DAYS);
    }

    #[test]
    fn test_backfill_conflicts_with_days_back() {
        assert!(parse(&["sync", "--backfill", "--days-back", "3"]).is_err());
    }

    #[test]
    fn test_zero_days_back_rejected() {
        assert!(parse(&["sync", "--days-back", "0"]).is_err());
    }

    #[test]
    fn test_abort_flag_keeps_environment_setting() {
        let env = SyncSettings {
            abort_on_query_error: true,
            ..SyncSettings::default()
        };
        let settings = sync_args(&["sync"]).apply(env);
        assert!(settings.abort_on_query_error);
        assert_eq!(settings.orders_days_back, 14);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
