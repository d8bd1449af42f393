//! Bounded retry with a per-attempt timeout.

use std::future::Future;
use std::time::Duration;

use assay_core::{StageError, StageResult};
use tracing::warn;

/// Run one stage attempt-by-attempt. Transient and malformed-output errors
/// are retried up to `max_retries` additional times with linear backoff;
/// unrecoverable errors and exhausted budgets surface immediately. A timed
/// out attempt counts as transient.
pub(crate) async fn run_stage<T, F, Fut>(
    name: &'static str,
    max_retries: u32,
    timeout: Duration,
    mut attempt: F,
) -> StageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StageResult<T>>,
{
    let mut tries: u32 = 0;
    loop {
        tries += 1;
        let error = match tokio::time::timeout(timeout, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => StageError::Transient(format!(
                "stage {name} timed out after {}s",
                timeout.as_secs()
            )),
        };

        if !error.is_retryable() || tries > max_retries {
            return Err(error);
        }
        let backoff = Duration::from_millis(500 * u64::from(tries));
        warn!(
            stage = name,
            attempt = tries,
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "stage attempt failed, retrying"
        );
        tokio::time::sleep(backoff).await;
    }
}
