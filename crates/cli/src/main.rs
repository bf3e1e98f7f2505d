mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ckansync_core::catalog::{CatalogClient, CkanClient, EntryQuery};
use ckansync_core::identifiers::{candidate_identifiers, diagnostic_search_terms, search_queries};
use ckansync_core::matcher::accept_entry;
use ckansync_core::tracking::TrackingStore;
use ckansync_core::{
    load_config, validate_config, Config, Monitor, MonitorSettings, Reconciler, RunOptions,
    SanitizedConfig, SqliteTrackingStore,
};

use cli::{Cli, Commands, ProbeArgs, ScanArgs};

/// Search hits listed per probe term.
const PROBE_HITS_SHOWN: usize = 5;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug(), cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool, json: bool) {
    let default_filter = if debug {
        "info,ckansync_core=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    match &cli.command {
        Commands::Scan(args) => scan(&config, args).await,
        Commands::Probe(args) => probe(&config, args).await,
        Commands::Tracking => show_tracking(&config),
        Commands::Config => show_config(&config),
    }
}

async fn scan(config: &Config, args: &ScanArgs) -> Result<()> {
    let directory = args
        .directory
        .clone()
        .unwrap_or_else(|| config.monitor.directory.clone());

    let client: Arc<dyn CatalogClient> =
        Arc::new(CkanClient::new(&config.catalog).context("Failed to create catalog client")?);
    let settings = MonitorSettings::from_config(config)?;

    let mut monitor = Monitor::new(client, settings);
    if config.tracking.enabled {
        let store = SqliteTrackingStore::new(&config.tracking.path).with_context(|| {
            format!("Failed to open tracking store {:?}", config.tracking.path)
        })?;
        monitor = monitor.with_tracking(Arc::new(store));
    }

    let outcome = monitor
        .run(
            &directory,
            RunOptions {
                debug: args.debug,
                force: args.force,
            },
        )
        .await
        .with_context(|| format!("Failed to scan {:?}", directory))?;

    println!("Directory: {}", outcome.directory.display());
    println!("Catalog:   {}", config.catalog.base_url());
    match (outcome.catalog_available, outcome.catalog_entries) {
        (false, _) => println!("           unavailable, lookups skipped"),
        (true, Some(count)) => println!("           {} entries", count),
        (true, None) => {}
    }
    println!(
        "Scanned {} files: {} excluded, {} unreadable, {} directories skipped\n",
        outcome.scan_stats.scanned,
        outcome.scan_stats.excluded,
        outcome.scan_stats.unreadable,
        outcome.scan_stats.skipped_dirs
    );
    print!("{}", outcome.report);

    Ok(())
}

async fn probe(config: &Config, args: &ProbeArgs) -> Result<()> {
    let filename = args.filename.as_str();
    let settings = MonitorSettings::from_config(config)?;

    println!("Candidate identifiers:");
    for id in candidate_identifiers(filename) {
        println!("  {}", id);
    }
    println!("Search queries:");
    for query in search_queries(filename, &config.reconcile.keyword_families) {
        println!("  {}", query);
    }

    let client = Arc::new(CkanClient::new(&config.catalog).context("Failed to create catalog client")?);
    client
        .check_status()
        .await
        .with_context(|| format!("Catalog at {} is unavailable", config.catalog.base_url()))?;

    println!("Search hits:");
    for term in diagnostic_search_terms(filename) {
        let query = EntryQuery::text(term.as_str()).with_private(config.catalog.include_private);
        match client.search_entries(&query).await {
            Ok(entries) => {
                println!("  {:?}: {} results", term, entries.len());
                for entry in entries.iter().take(PROBE_HITS_SHOWN) {
                    let verdict = match accept_entry(entry, filename) {
                        Some(acceptance) => format!("accepted ({})", acceptance),
                        None => "rejected".to_string(),
                    };
                    println!(
                        "    {} \"{}\" {} resources, {}",
                        entry.identifier,
                        entry.title_or_identifier(),
                        entry.resources.len(),
                        verdict
                    );
                }
            }
            Err(e) => println!("  {:?}: error: {}", term, e),
        }
    }

    let reconciler = Reconciler::new(client, settings.reconcile.with_debug(true), settings.zone);
    match reconciler.lookup(filename).await {
        Some(found) => println!(
            "Resolved via {} with timestamp {}",
            found.matched_via,
            found.timestamp.to_rfc3339()
        ),
        None => println!("No catalog counterpart found"),
    }

    Ok(())
}

fn show_tracking(config: &Config) -> Result<()> {
    let path = &config.tracking.path;
    if !path.exists() {
        println!("No tracking snapshot at {}", path.display());
        return Ok(());
    }

    let store = SqliteTrackingStore::new(path)
        .with_context(|| format!("Failed to open tracking store {:?}", path))?;
    let snapshot = store.load().context("Failed to read tracking snapshot")?;

    println!("{} files recorded in {}", snapshot.len(), path.display());
    for (file, created_at) in &snapshot {
        println!("  {}  {}", created_at.to_rfc3339(), file.display());
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let sanitized = SanitizedConfig::from(config);
    println!("{}", serde_json::to_string_pretty(&sanitized)?);
    Ok(())
}
