use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retries `f` up to `max_retries` additional times (so `max_retries + 1`
/// attempts total), sleeping `delay` between attempts. A crashed worker
/// re-enqueues its in-flight task instead of retrying in place — this
/// covers the in-process "transient failure, try again" case, not worker
/// death.
pub async fn with_retry<F, Fut, T, E>(max_retries: u32, delay: Duration, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                attempt += 1;
                warn!(attempt, max_retries, error = %err, "task failed, retrying after delay");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_the_limit_then_surfaces_the_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(2, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom")
        })
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_a_transient_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(3, Duration::from_millis(1), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient")
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
