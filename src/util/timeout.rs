//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::BridgeError;

/// Wrap a future with a timeout.
///
/// On expiry the inner future is dropped, abandoning whatever it was doing.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_future_maps_to_timeout_error() {
        let err = with_timeout(Duration::from_millis(250), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, BridgeError>(())
        })
        .await
        .expect_err("sleep should outlast the deadline");

        assert!(matches!(err, BridgeError::Timeout(250)));
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(BridgeError::Transport("closed".into()))
        })
        .await
        .expect_err("inner error should surface");

        assert!(matches!(err, BridgeError::Transport(message) if message == "closed"));
    }
}
