use clap::Parser;
use miette::{IntoDiagnostic, Result};
use spendscan::application::controller::{CycleOutcome, DiscardReason, ReconciliationController};
use spendscan::application::session::{Notice, ScanSession};
use spendscan::domain::lifecycle::LifecycleWatcher;
use spendscan::domain::ports::ExpenseStoreBox;
use spendscan::domain::scan::ScanGate;
use spendscan::domain::tags::TagCatalog;
use spendscan::infrastructure::in_memory::{InMemoryExpenseStore, SchemeLauncher};
use spendscan::interfaces::csv::event_reader::EventReader;
use spendscan::interfaces::csv::expense_writer::ExpenseWriter;
use spendscan::settings::Settings;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recorded session events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scan debounce window in milliseconds, overriding the settings
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let (session_store, output_store) = open_store(cli.db_path)?;

    let debounce = cli
        .debounce_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.debounce());
    let controller = ReconciliationController::new(
        Box::new(SchemeLauncher::new(settings.handler_schemes.clone())),
        session_store,
    );
    let mut session = ScanSession::new(
        ScanGate::new(debounce),
        LifecycleWatcher::default(),
        controller,
        TagCatalog::with_custom(&settings.custom_tags),
    );

    // Replay the recorded events
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => match session.apply(event).await {
                Ok(Some(notice)) => report(notice),
                Ok(None) => {}
                Err(e) => eprintln!("Error processing event: {}", e),
            },
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Leaving the screen discards anything still pending
    if let Some(outcome) = session.close() {
        report(Notice::Finished(outcome));
    }

    let records = output_store.all().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ExpenseWriter::new(stdout.lock());
    writer.write_records(records).into_diagnostic()?;

    Ok(())
}

fn report(notice: Notice) {
    match notice {
        Notice::Scanned(payload) => eprintln!("QR scanned: {}", payload),
        Notice::HandedOff => eprintln!("Waiting for the payment app to return..."),
        Notice::Prompt(prompt) => eprintln!("{}", prompt),
        Notice::Finished(CycleOutcome::Committed(record)) => {
            eprintln!("Success: transaction recorded (id {})", record.id)
        }
        Notice::Finished(CycleOutcome::Discarded(reason)) => {
            let why = match reason {
                DiscardReason::Declined => "payment not confirmed",
                DiscardReason::Cancelled => "payment cancelled",
                DiscardReason::TornDown => "screen closed before the payment app returned",
            };
            eprintln!("Discarded: {}", why)
        }
        Notice::ManualRecorded(record) => {
            eprintln!("Success: expense added (id {})", record.id)
        }
        Notice::TagsChanged(tags) => eprintln!("Tags: {}", tags.join(", ")),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<(ExpenseStoreBox, ExpenseStoreBox)> {
    use spendscan::infrastructure::rocksdb::RocksDbExpenseStore;

    if let Some(db_path) = db_path {
        let store = RocksDbExpenseStore::open(db_path).into_diagnostic()?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }
    let store = InMemoryExpenseStore::new();
    Ok((Box::new(store.clone()), Box::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<(ExpenseStoreBox, ExpenseStoreBox)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    let store = InMemoryExpenseStore::new();
    Ok((Box::new(store.clone()), Box::new(store)))
}
