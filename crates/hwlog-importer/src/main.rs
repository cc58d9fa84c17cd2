//! hwlog-importer - CSV to PostgreSQL import tool

use anyhow::{Context, Result};
use clap::Parser;
use hwlog_common::logging::{init_logging, LogConfig, LogLevel};
use hwlog_importer::{
    config::ImporterConfig,
    db::{self, DbConfig},
    event::{ObjectLocator, StorageEvent},
    pipeline::CsvImportPipeline,
    storage::{Storage, StorageConfig},
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "hwlog-importer")]
#[command(author, version, about = "Import delimited log objects into PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Target table override
    #[arg(short, long, global = true)]
    table: Option<String>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Import a single object
    Import {
        /// Source bucket
        #[arg(short, long)]
        bucket: String,

        /// Object key (already decoded)
        #[arg(short, long)]
        key: String,
    },

    /// Import every object named by a storage event notification document
    Event {
        /// Path to the notification JSON
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Environment settings win over defaults; --verbose wins over both
    let mut log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_file_prefix("hwlog-importer");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }

    init_logging(&log_config)?;

    let mut importer_config = ImporterConfig::from_env()?;
    if let Some(table) = cli.table {
        importer_config = importer_config.with_table(table);
        importer_config.validate()?;
    }

    // The pool is built once per process and reused across every import
    let db_config = DbConfig::from_env()?;
    let pool = db::create_pool(&db_config).await?;
    db::health_check(&pool).await?;

    let storage = Storage::new(StorageConfig::from_env()?).await?;
    let pipeline = CsvImportPipeline::new(pool, storage, importer_config);

    let locators = resolve_locators(&cli.command)?;

    let mut total_rows = 0u64;
    for locator in &locators {
        info!(object = %locator, "Starting import");
        let rows = pipeline.run(locator).await?;
        total_rows += rows;
    }

    info!(
        objects = locators.len(),
        rows = total_rows,
        "All imports complete"
    );

    Ok(())
}

/// Resolve the command into the locators to import, applying the `.csv`
/// suffix filter the trigger is scoped to.
fn resolve_locators(command: &Command) -> Result<Vec<ObjectLocator>> {
    match command {
        Command::Import { bucket, key } => Ok(vec![ObjectLocator::new(bucket, key)]),
        Command::Event { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("could not read event file {}", file.display()))?;
            let event = StorageEvent::from_json(&raw)?;

            let (csv, skipped): (Vec<_>, Vec<_>) = event
                .locators()?
                .into_iter()
                .partition(ObjectLocator::is_csv);

            for locator in &skipped {
                warn!(object = %locator, "Skipping object without .csv suffix");
            }

            if csv.is_empty() {
                anyhow::bail!("event names no .csv objects");
            }

            Ok(csv)
        },
    }
}
