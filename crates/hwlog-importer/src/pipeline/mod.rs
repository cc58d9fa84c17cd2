//! CSV import pipeline
//!
//! Wires the stream source, parser, schema reconciliation, batching, and
//! write tracking into one session per object. The entry point resolves
//! only after every registered write task has resolved.

use hwlog_common::{ImportError, Result};
use sqlx::PgPool;
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::ImporterConfig,
    db::{
        insert::{self, WriteOptions},
        schema,
    },
    event::ObjectLocator,
    storage::Storage,
};

pub mod batcher;
pub mod parser;
pub mod session;

use batcher::{Batch, BatchAccumulator};
use parser::CsvRowStream;
use session::{SessionState, SessionTracker};

/// One importer process's pipeline: a shared store handle, a storage
/// client, and the batching policy.
pub struct CsvImportPipeline {
    db: PgPool,
    storage: Storage,
    config: ImporterConfig,
}

impl CsvImportPipeline {
    /// The pool is the process-wide handle from [`crate::db::create_pool`];
    /// it is reused across every import this pipeline runs.
    pub fn new(db: PgPool, storage: Storage, config: ImporterConfig) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Run one import session to completion.
    ///
    /// Resolves with the total data-row count on success, or the first
    /// fatal error. Never returns before every submitted write task has
    /// resolved.
    #[instrument(skip(self), fields(object = %locator, table = %self.config.table))]
    pub async fn run(&self, locator: &ObjectLocator) -> Result<u64> {
        let mut tracker = SessionTracker::new();
        info!("Import session started");

        match self.run_session(locator, &mut tracker).await {
            Ok(rows) => {
                tracker.advance(SessionState::Complete);
                info!(rows, "Import session complete");
                Ok(rows)
            },
            Err(e) => {
                tracker.advance(SessionState::Failed);
                error!(error = %e, "Import session failed");
                Err(e)
            },
        }
    }

    async fn run_session(
        &self,
        locator: &ObjectLocator,
        tracker: &mut SessionTracker,
    ) -> Result<u64> {
        let reader = self.storage.object_reader(locator).await?;
        tracker.advance(SessionState::HeaderPending);

        let mut rows = CsvRowStream::new(reader, self.config.discard_rows);
        let headers = rows.headers().await?;
        tracker.advance(SessionState::ValidatingSchema);

        // Awaited before the first row event: a row accepted ahead of
        // validation could be committed into a table with the wrong shape.
        schema::reconcile(&self.db, &self.config.table, &headers).await?;
        let columns = Arc::new(headers);
        tracker.advance(SessionState::Ingesting);

        let mut accumulator = BatchAccumulator::new(self.config.batch_size);
        let mut parse_failure: Option<ImportError> = None;

        loop {
            match rows.next_row().await {
                Ok(Some(row)) => {
                    if let Some(batch) = accumulator.push(row) {
                        if tracker.has_failed() {
                            warn!("A write task failed; no further batches will be submitted");
                            break;
                        }
                        self.submit(tracker, Arc::clone(&columns), batch);
                    }
                },
                Ok(None) => {
                    // The final flush is submitted unconditionally, empty
                    // included, so task bookkeeping stays uniform.
                    if !tracker.has_failed() {
                        let remainder = accumulator.finish();
                        self.submit(tracker, Arc::clone(&columns), remainder);
                    }
                    break;
                },
                Err(e) => {
                    parse_failure = Some(e);
                    break;
                },
            }
        }

        info!(
            rows = accumulator.total_rows(),
            tasks = tracker.task_count(),
            "Input exhausted, draining write tasks"
        );
        tracker.advance(SessionState::Draining);
        let drained = tracker.drain().await;

        if let Some(parse_err) = parse_failure {
            return Err(parse_err);
        }
        drained?;

        Ok(rows.rows_delivered())
    }

    /// Spawn one write task for a detached batch and register it with the
    /// session tracker.
    fn submit(&self, tracker: &mut SessionTracker, columns: Arc<Vec<String>>, batch: Batch) {
        let pool = self.db.clone();
        let table = self.config.table.clone();
        let options = WriteOptions {
            chunk_size: self.config.insert_chunk_size,
            retries: self.config.write_retries,
            backoff_ms: self.config.retry_backoff_ms,
        };
        let failure_flag = tracker.failure_flag();
        let sequence = tracker.task_count();
        let batch_rows = batch.len();

        let handle = tokio::spawn(async move {
            let result = insert::insert_batch(&pool, &table, &columns, &batch, &options).await;
            match &result {
                Ok(committed) => {
                    debug!(batch = sequence, rows = committed, "Batch write resolved");
                },
                Err(e) => {
                    failure_flag.store(true, Ordering::SeqCst);
                    error!(batch = sequence, error = %e, "Batch write failed");
                },
            }
            result
        });

        tracker.register(handle);
        debug!(batch = sequence, rows = batch_rows, "Batch submitted");
    }
}
