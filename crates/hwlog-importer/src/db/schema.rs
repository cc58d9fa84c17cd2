//! Target table schema reconciliation
//!
//! On the header event the pipeline either validates the existing table's
//! column set against the file's headers or creates the table. Either way
//! the outcome is awaited before the first row is accepted: a row committed
//! ahead of validation could land in a table with the wrong shape.

use hwlog_common::{ImportError, Result};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

/// Fixed name of the surrogate auto-increment primary key column.
pub const ID_COLUMN: &str = "id";

/// Character capacity of every non-key column.
///
/// All ingested fields are stored as bounded-width strings; value-level
/// type inference is out of scope.
pub const STRING_COLUMN_WIDTH: u32 = 32;

/// Validate or create the target table for the given header set.
#[instrument(skip(pool, headers), fields(columns = headers.len()))]
pub async fn reconcile(pool: &PgPool, table: &str, headers: &[String]) -> Result<()> {
    if table_exists(pool, table).await? {
        debug!(table = %table, "Table exists, validating column set");
        let existing = fetch_column_names(pool, table).await?;
        validate_columns(&existing, headers)?;
        info!(table = %table, "Schema validated against existing table");
    } else {
        create_table(pool, table, headers).await?;
        info!(table = %table, columns = headers.len() + 1, "Table created");
    }

    Ok(())
}

/// The full column set an import requires: headers plus the surrogate key.
pub fn required_columns(headers: &[String]) -> Vec<String> {
    let mut required: Vec<String> = headers.to_vec();
    required.push(ID_COLUMN.to_string());
    required.sort();
    required
}

/// Compare the existing table's columns against the required set.
///
/// Order-independent set equality: a mismatch in either direction fails
/// with both sets attached for diagnostics.
pub fn validate_columns(existing: &[String], headers: &[String]) -> Result<()> {
    let required = required_columns(headers);
    let mut existing_sorted = existing.to_vec();
    existing_sorted.sort();

    if existing_sorted == required {
        Ok(())
    } else {
        Err(ImportError::SchemaMismatch {
            existing: existing_sorted,
            required,
        })
    }
}

/// DDL for a fresh target table: surrogate key first, then one bounded
/// string column per header, in header order.
pub fn create_table_sql(table: &str, headers: &[String]) -> String {
    let mut columns = vec![format!("{} SERIAL PRIMARY KEY", quote_ident(ID_COLUMN))];
    columns.extend(
        headers
            .iter()
            .map(|h| format!("{} VARCHAR({})", quote_ident(h), STRING_COLUMN_WIDTH)),
    );

    format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "))
}

/// Quote an identifier for interpolation into dynamic SQL.
///
/// Table and column names come from file headers, so they cannot be bound
/// as parameters; double-quoting with embedded-quote doubling keeps them
/// inert.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
        )",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .map_err(|e| ImportError::connection(format!("table existence check failed: {e}")))
}

async fn fetch_column_names(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT column_name::text FROM information_schema.columns
         WHERE table_schema = current_schema() AND table_name = $1",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| ImportError::connection(format!("column lookup failed: {e}")))
}

async fn create_table(pool: &PgPool, table: &str, headers: &[String]) -> Result<()> {
    let ddl = create_table_sql(table, headers);
    debug!(ddl = %ddl, "Creating target table");

    sqlx::query(&ddl)
        .execute(pool)
        .await
        .map_err(|e| ImportError::connection(format!("table creation failed: {e}")))?;

    Ok(())
}
