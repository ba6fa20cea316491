//! Retry classification and capped-exponential backoff.
//!
//! The scheduler re-enqueues a failed task rather than retrying an inline
//! future (unlike a typical retry helper), so this module only exposes the
//! classification trait and the delay computation; `scheduler` owns the
//! actual re-enqueue-after-delay mechanics.

use crate::error::Error;
use std::time::Duration;

/// Classifies whether an error is worth retrying.
///
/// Transient I/O (network, timeout), a transient database connection blip,
/// and upstream-format errors are retryable — the feed may self-heal on the
/// next attempt. Validation, config, integrity, and cancellation errors are
/// not; genuine constraint violations never surface here since `store_item`
/// absorbs them via `ON CONFLICT DO UPDATE`.
pub trait IsRetryable {
    /// Returns true if the operation should be retried.
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Upstream(_) | Error::Parse(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Database(e) => matches!(e, crate::error::DatabaseError::ConnectionFailed(_)),
            Error::Sqlx(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed | sqlx::Error::Io(_)
            ),
            Error::Config { .. } => false,
            Error::ConfigWatch(_) => false,
            Error::Cancelled => false,
            Error::NotFound(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Maximum backoff delay, per the capped-exponential retry policy.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Computes the delay before the `retry_count`-th retry (1-indexed):
/// `min(2^(retry_count-1) seconds, 30 seconds)`.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let secs = 2u64.saturating_pow(retry_count.saturating_sub(1));
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(10), MAX_BACKOFF);
        assert_eq!(backoff_delay(100), MAX_BACKOFF);
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = Error::Config {
            file: "feeds/a.yml".into(),
            message: "missing title".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn upstream_format_errors_are_retryable() {
        assert!(Error::Upstream("empty body".into()).is_retryable());
        assert!(Error::Parse("malformed xml".into()).is_retryable());
    }

    #[test]
    fn transient_database_errors_are_retryable() {
        assert!(Error::Database(crate::error::DatabaseError::ConnectionFailed("timed out".into())).is_retryable());
        assert!(Error::Sqlx(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(Error::Sqlx(sqlx::Error::PoolClosed).is_retryable());
        assert!(Error::Sqlx(sqlx::Error::WorkerCrashed).is_retryable());
    }

    #[test]
    fn database_integrity_errors_are_not_retryable() {
        assert!(!Error::Database(crate::error::DatabaseError::QueryFailed("constraint violated".into())).is_retryable());
        assert!(!Error::Sqlx(sqlx::Error::RowNotFound).is_retryable());
    }
}
