//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::NoteLlmError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, NoteLlmError>>,
) -> Result<T, NoteLlmError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(NoteLlmError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, NoteLlmError>(())
        })
        .await;

        assert!(matches!(result, Err(NoteLlmError::Timeout(50))));
    }

    #[tokio::test]
    async fn fast_future_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, NoteLlmError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
