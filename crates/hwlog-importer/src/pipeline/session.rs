//! Import session tracking
//!
//! Owns the set of in-flight write tasks and the session state machine for
//! one import. Completion means awaiting every registered task's join
//! handle; there is no polling.

use hwlog_common::{ImportError, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::task::JoinHandle;
use tracing::debug;

/// States of one import session, initial to terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Started,
    HeaderPending,
    ValidatingSchema,
    Ingesting,
    Draining,
    Complete,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Started => "started",
            SessionState::HeaderPending => "header_pending",
            SessionState::ValidatingSchema => "validating_schema",
            SessionState::Ingesting => "ingesting",
            SessionState::Draining => "draining",
            SessionState::Complete => "complete",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks every write task registered during one import.
pub struct SessionTracker {
    state: SessionState,
    tasks: Vec<JoinHandle<Result<u64>>>,
    failed: Arc<AtomicBool>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::Started,
            tasks: Vec::new(),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn advance(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session state transition");
        self.state = next;
    }

    /// Shared flag a write task raises on failure; checked before every
    /// new submission so no further batches follow a failed write.
    pub fn failure_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Register a spawned write task, final flush included.
    pub fn register(&mut self, handle: JoinHandle<Result<u64>>) {
        self.tasks.push(handle);
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Await every registered task.
    ///
    /// Resolves to the total rows committed, or the first error in
    /// registration order with the committed total across all resolved
    /// tasks attached. Completion order of the tasks themselves is not
    /// assumed.
    pub async fn drain(&mut self) -> Result<u64> {
        let mut committed = 0u64;
        let mut first_error: Option<ImportError> = None;

        for handle in self.tasks.drain(..) {
            match handle.await {
                Ok(Ok(rows)) => committed += rows,
                Ok(Err(e)) => {
                    if let ImportError::Write { rows_committed, .. } = &e {
                        committed += rows_committed;
                    }
                    first_error.get_or_insert(e);
                },
                Err(join_err) => {
                    first_error
                        .get_or_insert_with(|| {
                            ImportError::write(0, format!("insert task aborted: {join_err}"))
                        });
                },
            }
        }

        match first_error {
            None => Ok(committed),
            Some(ImportError::Write { message, .. }) => Err(ImportError::write(committed, message)),
            Some(other) => Err(other),
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_sums_committed_rows() {
        let mut tracker = SessionTracker::new();
        for rows in [5000u64, 5000, 2000] {
            tracker.register(tokio::spawn(async move { Ok(rows) }));
        }

        assert_eq!(tracker.task_count(), 3);
        assert_eq!(tracker.drain().await.unwrap(), 12_000);
    }

    #[tokio::test]
    async fn test_drain_reports_first_error_with_partial_progress() {
        let mut tracker = SessionTracker::new();
        tracker.register(tokio::spawn(async { Ok(5000) }));
        tracker.register(tokio::spawn(async {
            Err(ImportError::write(300, "connection reset"))
        }));
        tracker.register(tokio::spawn(async { Ok(2000) }));

        match tracker.drain().await.unwrap_err() {
            ImportError::Write {
                rows_committed,
                message,
            } => {
                // 5000 + 300 partial + 2000 from the task that still resolved
                assert_eq!(rows_committed, 7300);
                assert!(message.contains("connection reset"));
            },
            other => panic!("unexpected variant: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_flag_shared_with_tasks() {
        let mut tracker = SessionTracker::new();
        let flag = tracker.failure_flag();

        tracker.register(tokio::spawn(async move {
            flag.store(true, Ordering::SeqCst);
            Err(ImportError::write(0, "boom"))
        }));

        assert!(tracker.drain().await.is_err());
        assert!(tracker.has_failed());
    }

    #[tokio::test]
    async fn test_drain_with_no_tasks_is_zero() {
        let mut tracker = SessionTracker::new();
        assert_eq!(tracker.drain().await.unwrap(), 0);
    }

    #[test]
    fn test_state_transitions() {
        let mut tracker = SessionTracker::new();
        assert_eq!(tracker.state(), SessionState::Started);
        assert!(!tracker.state().is_terminal());

        tracker.advance(SessionState::HeaderPending);
        tracker.advance(SessionState::ValidatingSchema);
        tracker.advance(SessionState::Ingesting);
        tracker.advance(SessionState::Draining);
        tracker.advance(SessionState::Complete);

        assert!(tracker.state().is_terminal());
    }
}
