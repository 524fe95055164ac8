//! The admission and playback-queue core
//!
//! Everything here mutates party state and the queue through single
//! SQLite transactions. Under WAL, two transactions racing on the same
//! rows resolve by one of them failing with a busy/locked error instead
//! of losing an update; those failures are retried a bounded number of
//! times and then surfaced as a retryable conflict.

pub mod admission;
pub mod navigator;
pub mod payment;

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempts before a conflicting transaction is given up on
const MAX_TXN_ATTEMPTS: u32 = 5;

/// Pause between conflict retries
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Run a transactional operation, retrying on write conflicts
///
/// The closure must build a fresh transaction per call so each retry
/// sees a current snapshot. Non-conflict errors pass straight through.
pub(crate) async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if is_conflict(&err) => {
                if attempt >= MAX_TXN_ATTEMPTS {
                    debug!("Giving up after {} conflicting attempts", attempt);
                    return Err(Error::TransactionConflict);
                }
                debug!("Transaction conflict on attempt {}, retrying", attempt);
                tokio::time::sleep(RETRY_BACKOFF).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Whether an error means "another writer got there first"
///
/// Covers SQLite busy/locked results (including stale WAL snapshots) and
/// a lost race on the queue's play_order uniqueness.
fn is_conflict(err: &Error) -> bool {
    let Error::Database(sqlx::Error::Database(db_err)) = err else {
        return false;
    };

    if db_err.is_unique_violation() && db_err.message().contains("queue.play_order") {
        return true;
    }

    let message = db_err.message();
    message.contains("database is locked") || message.contains("database table is locked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_with_retry_passes_success_through() {
        let result: Result<i32> = with_retry(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_terminal_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::UnknownSong("x".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::UnknownSong(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert!(!is_conflict(&Error::InsufficientCredits));
        assert!(!is_conflict(&Error::NotFound("x".to_string())));
    }
}
