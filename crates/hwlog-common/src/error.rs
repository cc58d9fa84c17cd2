//! Error types for CSV imports

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal errors surfaced by an import session.
///
/// Every variant aborts the session and propagates to the entry point's
/// caller; none are swallowed into background tasks.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The source object could not be fetched, or its locator was malformed
    #[error("object retrieval failed: {0}")]
    Retrieval(String),

    /// The database handle is unavailable or unreachable
    #[error("database connection failed: {0}")]
    Connection(String),

    /// A malformed input line was encountered mid-stream
    #[error("parse failure after {rows_processed} rows: {message}")]
    Parse { rows_processed: u64, message: String },

    /// The existing table's column set does not match the file's headers
    #[error("table columns do not match file headers (existing: {existing:?}, required: {required:?})")]
    SchemaMismatch {
        existing: Vec<String>,
        required: Vec<String>,
    },

    /// A batch write failed; prior chunks are not rolled back
    #[error("batch write failed after {rows_committed} rows committed: {message}")]
    Write { rows_committed: u64, message: String },
}

impl ImportError {
    /// Create a retrieval error with source context
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    /// Create a connection error with source context
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a parse error carrying the rows delivered so far
    pub fn parse(rows_processed: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            rows_processed,
            message: message.into(),
        }
    }

    /// Create a write error carrying the rows committed before the failure
    pub fn write(rows_committed: u64, message: impl Into<String>) -> Self {
        Self::Write {
            rows_committed,
            message: message.into(),
        }
    }

    /// Whether a bounded retry is ever worthwhile for this error.
    ///
    /// Schema and parse failures are structural, not transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Write { .. })
    }
}
