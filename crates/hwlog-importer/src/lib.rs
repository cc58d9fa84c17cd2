//! hwlog Importer Library
//!
//! Streaming CSV ingestion from object storage into PostgreSQL.
//!
//! # Overview
//!
//! One import session consumes a single CSV object end to end:
//!
//! 1. **Storage** fetches a readable byte stream for the object.
//! 2. **Pipeline** parses the stream incrementally: one header event, then
//!    row events, then an end event. Header position 0 is always renamed to
//!    `time`; a configurable discard window drops non-data lines that
//!    immediately follow the header.
//! 3. **Schema** reconciles the headers against the target table before any
//!    row is accepted: validate an existing table's column set, or create
//!    the table with an auto-increment `id` key and one `VARCHAR(32)`
//!    column per header.
//! 4. Rows accumulate into 5000-row batches; each full batch becomes one
//!    concurrent insert task, internally written in chunks of at most 1000
//!    rows. The final partial batch (possibly empty) is always submitted.
//! 5. The session completes only once every insert task has resolved; the
//!    caller receives the total row count, or the first fatal error.
//!
//! # Example
//!
//! ```no_run
//! use hwlog_importer::{
//!     config::ImporterConfig,
//!     db::{self, DbConfig},
//!     event::ObjectLocator,
//!     pipeline::CsvImportPipeline,
//!     storage::{Storage, StorageConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::create_pool(&DbConfig::from_env()?).await?;
//!     let storage = Storage::new(StorageConfig::from_env()?).await?;
//!     let pipeline = CsvImportPipeline::new(pool, storage, ImporterConfig::from_env()?);
//!
//!     let locator = ObjectLocator::new("logs-bucket", "boards/2026-08-07.csv");
//!     let rows = pipeline.run(&locator).await?;
//!     println!("imported {rows} rows");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod event;
pub mod pipeline;
pub mod storage;

// Re-export the error taxonomy shared across the workspace
pub use hwlog_common::{ImportError, Result};
