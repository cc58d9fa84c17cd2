//! Importer configuration

use serde::{Deserialize, Serialize};

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Default target table for imported rows.
pub const DEFAULT_TABLE: &str = "hwlog";

/// Rows accumulated before a batch is detached and submitted.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Maximum rows per INSERT statement inside one batch write.
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 1000;

/// Lines consumed, but never delivered, immediately after the header.
pub const DEFAULT_DISCARD_ROWS: usize = 1;

/// Retry attempts for a failed chunk write (0 = no retries).
pub const DEFAULT_WRITE_RETRIES: u32 = 0;

/// Base backoff between write retries, doubled per attempt.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Object key suffix accepted by the event trigger.
pub const CSV_SUFFIX: &str = ".csv";

/// Pipeline configuration for one importer process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterConfig {
    /// Target table name
    pub table: String,

    /// Rows per detached batch
    pub batch_size: usize,

    /// Rows per INSERT statement within a batch write
    pub insert_chunk_size: usize,

    /// Discard window: rows dropped immediately after the header.
    ///
    /// The upstream format carries a units line right below the header;
    /// whether the window was ever meant to drop real data instead is
    /// unresolved, so the count stays configurable.
    pub discard_rows: usize,

    /// Bounded retries for failed chunk writes; never applied to parse or
    /// schema failures
    pub write_retries: u32,

    /// Base retry backoff in milliseconds, doubled per attempt
    pub retry_backoff_ms: u64,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            insert_chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
            discard_rows: DEFAULT_DISCARD_ROWS,
            write_retries: DEFAULT_WRITE_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl ImporterConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults above.
    ///
    /// Recognized variables: `HWLOG_TABLE`, `HWLOG_BATCH_SIZE`,
    /// `HWLOG_INSERT_CHUNK_SIZE`, `HWLOG_DISCARD_ROWS`,
    /// `HWLOG_WRITE_RETRIES`, `HWLOG_RETRY_BACKOFF_MS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            table: std::env::var("HWLOG_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
            batch_size: std::env::var("HWLOG_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
            insert_chunk_size: std::env::var("HWLOG_INSERT_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INSERT_CHUNK_SIZE),
            discard_rows: std::env::var("HWLOG_DISCARD_ROWS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DISCARD_ROWS),
            write_retries: std::env::var("HWLOG_WRITE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WRITE_RETRIES),
            retry_backoff_ms: std::env::var("HWLOG_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.table.is_empty() {
            anyhow::bail!("Target table name cannot be empty");
        }

        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.insert_chunk_size == 0 {
            anyhow::bail!("Insert chunk size must be greater than 0");
        }

        if self.insert_chunk_size > self.batch_size {
            anyhow::bail!(
                "Insert chunk size ({}) cannot be greater than batch size ({})",
                self.insert_chunk_size,
                self.batch_size
            );
        }

        Ok(())
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}
