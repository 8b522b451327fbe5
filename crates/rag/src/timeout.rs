//! Per-call deadline for outbound calls.

use catalyst_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Run `call`, failing with `AppError::Timeout` once `limit` elapses.
///
/// The inner future is dropped on expiry, which cancels it.
pub async fn with_timeout<F, T>(limit: Duration, what: &str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} did not complete within {}s",
            what,
            limit.as_secs_f32()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_elapsed_call_is_timeout_error() {
        let result: AppResult<()> = with_timeout(Duration::from_millis(20), "search", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok = with_timeout(Duration::from_secs(1), "lookup", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: AppResult<()> = with_timeout(Duration::from_secs(1), "lookup", async {
            Err(AppError::Storage("down".to_string()))
        })
        .await;
        assert!(matches!(err, Err(AppError::Storage(_))));
    }
}
