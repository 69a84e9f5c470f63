use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info, warn};
use std::fs;
use std::path::PathBuf;

use fluxlist::config::Config;
use fluxlist::domain::ListRecord;
use fluxlist::error::ListError;
use fluxlist::storage::{self, Filter, ListStateStorage};
use fluxlist::store::ListStore;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fluxlist")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("fluxlist.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        // Narrowed by `apply_log_level` once the config is loaded
        builder.filter_level(LevelFilter::Trace);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Level filter for a configured `log_level`, defaulting to info
fn parse_log_level(level: Option<&str>) -> LevelFilter {
    level
        .and_then(|level| match level.parse::<LevelFilter>() {
            Ok(filter) => Some(filter),
            Err(_) => {
                warn!("Unknown log level {:?}, using info", level);
                None
            }
        })
        .unwrap_or(LevelFilter::Info)
}

/// Apply the configured log level unless RUST_LOG decides it.
fn apply_log_level(level: Option<&str>) -> LevelFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return log::max_level();
    }
    let filter = parse_log_level(level);
    log::set_max_level(filter);
    filter
}

fn format_timestamp(ms: Option<u64>) -> String {
    ms.and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
        println!("  Storage: {:?} at {}", config.storage.backend, config.storage.data_dir.display());
    }

    let storage = storage::open(&config.storage).context("Failed to open list storage")?;
    let store = ListStore::with_storage(config.lists.clone(), storage.clone());

    match &cli.command {
        Commands::List { site, item } => handle_list_command(*site, *item, storage.as_ref()),
        Commands::Show { key, ids } => handle_show_command(key, *ids, storage.as_ref()),
        Commands::Prune { max_age_secs } => handle_prune_command(*max_age_secs, &store),
        Commands::Evict { key } => handle_evict_command(key, &store, storage.as_ref()),
    }
}

fn handle_list_command(site: Option<i64>, item: Option<i64>, storage: &dyn ListStateStorage) -> Result<()> {
    info!("Listing lists - site: {:?}, item: {:?}", site, item);
    let filters = list_filters(site, item);
    let records = storage.query(&filters).context("Failed to read lists")?;

    if records.is_empty() {
        println!("{}", "No lists stored".yellow());
        return Ok(());
    }

    for record in &records {
        let more = if record.can_load_more { "more".green() } else { "end".dimmed() };
        println!(
            "{}  {} items  {}  fetched {}",
            record.id.cyan(),
            record.size(),
            more,
            format_timestamp(record.last_fetched_at)
        );
    }
    println!("{} lists", records.len());
    Ok(())
}

fn list_filters(site: Option<i64>, item: Option<i64>) -> Vec<Filter> {
    site.map(Filter::site).into_iter().chain(item.map(Filter::with_item)).collect()
}

fn load_record(key: &str, storage: &dyn ListStateStorage) -> Result<ListRecord> {
    let record = storage
        .load(key)
        .context("Failed to read list")?
        .ok_or_else(|| ListError::ListNotFound(key.to_string()))?;
    Ok(record)
}

fn print_record(record: &ListRecord, ids: bool) {
    println!("{} {}", "List:".green(), record.id);
    println!("  Type:          {}", record.descriptor.type_id().as_str());
    println!("  Site:          {}", record.site_id);
    println!("  Items:         {}", record.size());
    if let Some(total) = record.total_count {
        println!("  Total:         {}", total);
    }
    println!("  Can load more: {}", record.can_load_more);
    println!("  Fetched:       {}", format_timestamp(record.last_fetched_at));
    println!("  Updated:       {}", format_timestamp(Some(record.updated_at)));
    if ids {
        let ids: Vec<String> = record.item_ids.iter().map(|id| id.to_string()).collect();
        println!("  Ids:           {}", ids.join(", "));
    }
}

fn handle_show_command(key: &str, ids: bool, storage: &dyn ListStateStorage) -> Result<()> {
    info!("Showing list: {}", key);
    let record = load_record(key, storage)?;
    print_record(&record, ids);
    Ok(())
}

fn handle_prune_command(max_age_secs: Option<u64>, store: &ListStore) -> Result<()> {
    let max_age_ms = max_age_secs
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(store.config().state_expiry_ms);
    info!("Pruning lists older than {}ms", max_age_ms);

    let removed = store.remove_expired(max_age_ms).context("Failed to prune lists")?;
    println!("{} {} lists", "Pruned:".green(), removed);
    Ok(())
}

fn handle_evict_command(key: &str, store: &ListStore, storage: &dyn ListStateStorage) -> Result<()> {
    info!("Evicting list: {}", key);
    let record = load_record(key, storage)?;

    store.evict(&record.descriptor).context("Failed to evict list")?;
    println!("{} {}", "Evicted:".yellow(), key);
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let level = apply_log_level(config.log_level.as_deref());

    info!("Starting with config from: {:?} (log level {})", cli.config, level);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
