//! Fail-open utilities for best-effort work
//!
//! Diagnostic capture and overlay dismissal must never mask the failure that
//! triggered them. Wrap them here: errors are logged and swallowed.
//!
//! DO NOT use fail-open for locating elements or asserting page state.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use scout_core::fail_open::fail_open;
/// use scout_core::Result;
///
/// async fn write_note() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let result = fail_open("diagnostics", || write_note()).await;
///     // result is None if write_note() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoutError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, ScoutError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_swallows_io_error() {
        let result = fail_open("write_note", || async {
            Err::<(), _>(ScoutError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        })
        .await;
        assert_eq!(result, None);
    }
}
