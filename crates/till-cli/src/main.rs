//! Till CLI - administrative surface for the offline-first sync core
//!
//! Inspect the sync queue, requeue failed entries, manage the store
//! profile, and run manual sync passes against the remote proxy.

mod error;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use till_core::config::{StoreContext, SyncSettings};
use till_core::db::{
    Database, LibSqlQueueRepository, LibSqlSalesRepository, LibSqlSettingsRepository,
    QueueRepository, SalesRepository, SettingsRepository,
};
use till_core::models::{EntryId, QueueEntry, QueueStatus, StoreProfile};
use till_core::sync::{
    ConnectivityMonitor, ConnectivityProbe, HttpConnectivityProbe, HttpRemoteStore, SyncEngine,
    SyncSignal, SyncStatePublisher,
};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "till")]
#[command(about = "Offline-first point-of-sale sync toolbox")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local database file
    #[arg(long, value_name = "PATH", global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sync status: queue counts and unsynced sales
    Status,
    /// Run one full sync pass (pull reference data, drain the queue)
    Sync {
        /// Remote proxy URL; falls back to TILL_SYNC_ENDPOINT
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
    /// Inspect or repair the sync queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Manage the active store profile
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List queue entries, newest first
    List {
        /// Filter by entry status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put failed entries back on the queue
    Retry {
        /// Queue entry ID
        id: Option<String>,
        /// Requeue every failed entry
        #[arg(long, conflicts_with = "id")]
        all_failed: bool,
    },
}

#[derive(Subcommand)]
enum StoreCommands {
    /// Show the configured store profile
    Show,
    /// Set the store profile used to scope remote calls
    Set {
        /// Store (tenant) identifier
        #[arg(long)]
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Tax percentage applied at checkout
        #[arg(long, default_value = "0")]
        tax: f64,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum StatusFilter {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl From<StatusFilter> for QueueStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Processing => Self::Processing,
            StatusFilter::Failed => Self::Failed,
            StatusFilter::Completed => Self::Completed,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("till=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Status => run_status(&db_path).await,
        Commands::Sync { endpoint } => run_sync(endpoint, &db_path).await,
        Commands::Queue { command } => match command {
            QueueCommands::List {
                status,
                limit,
                json,
            } => run_queue_list(status.map(QueueStatus::from), limit, json, &db_path).await,
            QueueCommands::Retry { id, all_failed } => {
                run_queue_retry(id.as_deref(), all_failed, &db_path).await
            }
        },
        Commands::Store { command } => match command {
            StoreCommands::Show => run_store_show(&db_path).await,
            StoreCommands::Set { id, name, tax } => run_store_set(&id, &name, tax, &db_path).await,
        },
    }
}

fn resolve_db_path(override_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let path = override_path.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("till")
            .join("till.db")
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}

async fn run_status(db_path: &Path) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let queue = LibSqlQueueRepository::new(db.connection());
    let sales = LibSqlSalesRepository::new(db.connection());
    let settings = LibSqlSettingsRepository::new(db.connection());

    match settings.load_store_profile().await? {
        Some(profile) => println!("Store:    {} ({})", profile.name, profile.id),
        None => println!("Store:    not configured"),
    }

    let pending = queue.pending_count().await?;
    let failed = queue.list(Some(QueueStatus::Failed), usize::MAX).await?;
    let completed = queue.list(Some(QueueStatus::Completed), usize::MAX).await?;
    let unsynced = sales.list_unsynced().await?;

    println!("Queue:    {pending} pending, {} failed, {} completed", failed.len(), completed.len());
    println!("Sales:    {} awaiting remote confirmation", unsynced.len());

    if !failed.is_empty() {
        println!("\nFailed entries (retry with `till queue retry <ID>`):");
        for line in format_entry_lines(&failed) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_sync(endpoint: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let endpoint = endpoint
        .or_else(|| env::var("TILL_SYNC_ENDPOINT").ok())
        .ok_or(CliError::SyncNotConfigured)?;

    let db = Arc::new(Database::open(db_path).await?);
    let settings_repo = LibSqlSettingsRepository::new(db.connection());
    let profile = settings_repo
        .load_store_profile()
        .await?
        .ok_or(CliError::NotSignedIn)?;

    let probe = HttpConnectivityProbe::new(endpoint.clone());
    let online = probe.check().await;
    if !online {
        println!("Remote proxy is unreachable; nothing synced.");
        return Ok(());
    }

    let remote = HttpRemoteStore::new(endpoint)?;
    let connectivity = ConnectivityMonitor::new(true);
    let publisher = SyncStatePublisher::new(true);
    let signal = SyncSignal::new();
    let context = StoreContext::with_profile(profile);
    let settings = SyncSettings::default();

    let engine = SyncEngine::new(
        Arc::clone(&db),
        remote,
        connectivity,
        publisher,
        signal,
        context,
        settings,
    );
    engine.sync_all().await?;

    let state = engine.publisher().current();
    println!("Sync completed ({} entries still pending)", state.pending_count);
    Ok(())
}

#[derive(Debug, Serialize)]
struct QueueListItem {
    id: String,
    status: String,
    action: String,
    collection: String,
    record_id: String,
    retry_count: u32,
    created_at: String,
    last_error: Option<String>,
}

fn entry_to_list_item(entry: &QueueEntry) -> QueueListItem {
    QueueListItem {
        id: entry.id.to_string(),
        status: entry.status.as_str().to_string(),
        action: entry.action.as_str().to_string(),
        collection: entry.collection.as_str().to_string(),
        record_id: entry.record_id.clone(),
        retry_count: entry.retry_count,
        created_at: entry.created_at.clone(),
        last_error: entry.last_error.clone(),
    }
}

fn format_entry_lines(entries: &[QueueEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let mut line = format!(
                "  {}  {:9}  {} {} {}  retries={}",
                entry.id,
                entry.status.as_str(),
                entry.action.as_str(),
                entry.collection.as_str(),
                entry.record_id,
                entry.retry_count,
            );
            if let Some(error) = &entry.last_error {
                line.push_str(&format!("  ({error})"));
            }
            line
        })
        .collect()
}

async fn run_queue_list(
    status: Option<QueueStatus>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let queue = LibSqlQueueRepository::new(db.connection());
    let entries = queue.list(status, limit).await?;

    if as_json {
        let items: Vec<QueueListItem> = entries.iter().map(entry_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }
    for line in format_entry_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

async fn run_queue_retry(
    id: Option<&str>,
    all_failed: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let queue = LibSqlQueueRepository::new(db.connection());

    if all_failed {
        let failed = queue.list(Some(QueueStatus::Failed), usize::MAX).await?;
        let mut requeued = 0usize;
        for entry in &failed {
            if queue.requeue_failed(&entry.id).await? {
                requeued += 1;
            }
        }
        println!("Requeued {requeued} failed entries");
        return Ok(());
    }

    let raw = id.ok_or_else(|| CliError::InvalidEntryId("missing entry ID".to_string()))?;
    let entry_id: EntryId = raw
        .parse()
        .map_err(|_| CliError::InvalidEntryId(raw.to_string()))?;
    if queue.requeue_failed(&entry_id).await? {
        println!("Requeued {entry_id}");
        Ok(())
    } else {
        Err(CliError::EntryNotRetriable(raw.to_string()))
    }
}

async fn run_store_show(db_path: &Path) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let settings = LibSqlSettingsRepository::new(db.connection());
    match settings.load_store_profile().await? {
        Some(profile) => {
            println!("id:   {}", profile.id);
            println!("name: {}", profile.name);
            println!("tax:  {}%", profile.tax_percentage);
            Ok(())
        }
        None => Err(CliError::NotSignedIn),
    }
}

async fn run_store_set(id: &str, name: &str, tax: f64, db_path: &Path) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let settings = LibSqlSettingsRepository::new(db.connection());
    let profile = StoreProfile::new(id, name, tax);
    settings.save_store_profile(&profile).await?;
    println!("Store profile saved: {name} ({id})");
    Ok(())
}
