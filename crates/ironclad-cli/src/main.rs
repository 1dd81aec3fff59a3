//! ironclad-inventory CLI
//!
//! Pulls assets from the configured sources and answers queries against the
//! merged inventory. Every command pulls fresh before it reads.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use ironclad_core::{AssetFilter, CoreError, InventoryManager, Selector};
use ironclad_sources::{SourceError, build_registry};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod output;

use config::Config;
use output::{Format, print_assets};

#[derive(Parser)]
#[command(name = "ironclad-inventory")]
#[command(about = "Ironclad unified inventory CLI", long_about = None)]
struct Cli {
    /// Configuration file (defaults to IRONCLAD_CONFIG or the standard paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding the configured one (RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull inventory from a source
    Pull {
        #[arg(long, default_value = "all")]
        source: Selector,
    },

    /// List assets
    List {
        #[arg(long, default_value = "all")]
        source: Selector,
        /// Filter by operating system (substring match)
        #[arg(long)]
        os: Option<String>,
        /// Filter by environment (substring match)
        #[arg(long)]
        environment: Option<String>,
        /// Filter by owner (substring match)
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Search assets by keyword
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "all")]
        source: Selector,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Show counts by source
    Stats {
        #[arg(long, default_value = "all")]
        source: Selector,
    },

    /// Find assets by IP address
    FindIp {
        /// IP address to search for (substring match)
        #[arg(long)]
        ip: String,
        #[arg(long, default_value = "all")]
        source: Selector,
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
}

impl Commands {
    fn selector(&self) -> &Selector {
        match self {
            Commands::Pull { source }
            | Commands::List { source, .. }
            | Commands::Search { source, .. }
            | Commands::Stats { source }
            | Commands::FindIp { source, .. } => source,
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Whether a failed pull came from a transient backend condition
fn is_retryable(err: &CoreError) -> bool {
    match err {
        CoreError::Fetch { error, .. } => error
            .downcast_ref::<SourceError>()
            .is_some_and(SourceError::is_retryable),
        _ => false,
    }
}

fn build_manager(config: &Config) -> Result<InventoryManager> {
    let registry = build_registry(&config.sources).wrap_err("invalid source configuration")?;

    let manager = InventoryManager::builder()
        .sources(registry)
        .failure_policy(config.failure_policy)
        .build()?;

    Ok(manager)
}

async fn run(command: Commands, manager: &InventoryManager) -> Result<()> {
    let selector = command.selector().clone();

    if let Err(err) = manager.pull(&selector).await {
        let retryable = is_retryable(&err);
        warn!(source = %err.source_name(), retryable, "pull failed");

        let context = if retryable {
            format!("failed to pull inventory for '{selector}' (transient backend error, try again)")
        } else {
            format!("failed to pull inventory for '{selector}'")
        };
        return Err(eyre::Report::new(err).wrap_err(context));
    }

    match command {
        Commands::Pull { .. } => {
            println!("Pulled inventory.");
            println!("Stats: {}", manager.stats().await);
        }
        Commands::List {
            os,
            environment,
            owner,
            format,
            ..
        } => {
            let mut filter = AssetFilter::new();
            if let Some(os) = os {
                filter = filter.os(os);
            }
            if let Some(environment) = environment {
                filter = filter.environment(environment);
            }
            if let Some(owner) = owner {
                filter = filter.owner(owner);
            }
            debug!(%filter, "listing assets");

            let assets = filter.apply(manager.list_assets(&selector).await);
            print_assets(&assets, format)?;
        }
        Commands::Search {
            query,
            limit,
            format,
            ..
        } => {
            let results = manager.search(&query, &selector).await;
            println!("Results: {}", results.len());
            print_assets(&AssetFilter::new().limit(limit).apply(results), format)?;
        }
        Commands::Stats { .. } => {
            println!("Stats: {}", manager.stats().await);
        }
        Commands::FindIp { ip, format, .. } => {
            let results = AssetFilter::new()
                .ip(ip.as_str())
                .apply(manager.list_assets(&selector).await);
            println!("Results for IP {ip}: {}", results.len());
            print_assets(&results, format)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let path = cli.config.clone().or_else(Config::locate);
    let config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(level, cli.log_json)?;

    match &path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using sources from environment"),
    }

    let manager = build_manager(&config)?;
    info!(
        sources = ?manager.source_names().collect::<Vec<_>>(),
        policy = ?manager.failure_policy(),
        "inventory manager ready"
    );

    run(cli.command, &manager).await
}
