//! Bulk batch writes
//!
//! One batch is written as a sequence of multi-row INSERT statements of at
//! most `chunk_size` rows, matched to store-side statement limits. A chunk
//! failure fails the whole batch write with the count of rows already
//! committed; prior chunks are not rolled back.

use hwlog_common::{ImportError, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::schema::quote_ident;

/// Write policy for one batch.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Maximum rows per INSERT statement
    pub chunk_size: usize,

    /// Bounded retries per chunk; 0 disables retrying
    pub retries: u32,

    /// Base backoff between retries, doubled per attempt
    pub backoff_ms: u64,
}

/// Write a batch and return the number of rows committed.
///
/// An empty batch resolves immediately with 0; the final flush submits one
/// regardless so session bookkeeping stays uniform.
#[instrument(skip(pool, columns, rows), fields(table = %table, rows = rows.len()))]
pub async fn insert_batch(
    pool: &PgPool,
    table: &str,
    columns: &[String],
    rows: &[Vec<String>],
    options: &WriteOptions,
) -> Result<u64> {
    if rows.is_empty() {
        debug!("Empty batch, nothing to write");
        return Ok(0);
    }

    let chunk_size = effective_chunk_size(options.chunk_size, columns.len());
    let mut committed = 0u64;

    for chunk in rows.chunks(chunk_size) {
        committed += write_chunk_with_retry(pool, table, columns, chunk, options, committed).await?;
    }

    debug!(committed, "Batch write complete");

    Ok(committed)
}

/// Clamp the configured chunk size to the store's bind-parameter limit.
///
/// Postgres caps bind parameters per statement at `u16::MAX`.
pub fn effective_chunk_size(chunk_size: usize, column_count: usize) -> usize {
    let max_rows = (u16::MAX as usize) / column_count.max(1);
    chunk_size.min(max_rows).max(1)
}

async fn write_chunk_with_retry(
    pool: &PgPool,
    table: &str,
    columns: &[String],
    chunk: &[Vec<String>],
    options: &WriteOptions,
    committed_before: u64,
) -> Result<u64> {
    let mut attempt = 0u32;

    loop {
        match write_chunk(pool, table, columns, chunk).await {
            Ok(affected) => return Ok(affected),
            Err(e) if attempt < options.retries => {
                attempt += 1;
                let backoff =
                    Duration::from_millis(options.backoff_ms << (attempt - 1).min(10));
                warn!(
                    error = %e,
                    attempt,
                    max_attempts = options.retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Chunk write failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            },
            Err(e) => {
                return Err(ImportError::write(
                    committed_before,
                    format!("chunk of {} rows failed: {e}", chunk.len()),
                ));
            },
        }
    }
}

async fn write_chunk(
    pool: &PgPool,
    table: &str,
    columns: &[String],
    chunk: &[Vec<String>],
) -> std::result::Result<u64, sqlx::Error> {
    let mut query_builder = insert_statement(table, columns, chunk);
    let result = query_builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Build one multi-row INSERT for a chunk.
fn insert_statement<'a>(
    table: &str,
    columns: &[String],
    rows: &'a [Vec<String>],
) -> QueryBuilder<'a, Postgres> {
    let mut query_builder = QueryBuilder::new(format!("INSERT INTO {} (", quote_ident(table)));

    let mut separated = query_builder.separated(", ");
    for column in columns {
        separated.push(quote_ident(column));
    }
    separated.push_unseparated(") ");

    query_builder.push_values(rows, |mut b, row| {
        for value in row {
            b.push_bind(value);
        }
    });

    query_builder
}
