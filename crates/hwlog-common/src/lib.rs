//! hwlog Common Library
//!
//! Shared error handling and logging initialization for the hwlog workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the import error taxonomy used across the pipeline
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use hwlog_common::{ImportError, Result};
//!
//! fn check_progress(rows: u64) -> Result<u64> {
//!     if rows == 0 {
//!         return Err(ImportError::retrieval("empty object"));
//!     }
//!     Ok(rows)
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{ImportError, Result};
