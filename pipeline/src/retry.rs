//! Bounded-retry wrapper for remote calls

use std::future::Future;
use std::time::Duration;

use shared::{ApiFailure, ProgressEvent, StatusSink};

/// Retry budget for one remote call.
///
/// The delay is fixed rather than exponential: this client is
/// human-attended and low-rate, and a constant interval keeps the wait
/// messaging shown to the user honest.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

/// Run `operation` until it succeeds, fails terminally, or exhausts the
/// retry budget.
///
/// Transient failures (`ApiFailure::is_transient`) wait out the fixed delay
/// and try again, emitting a `RetryWait`/`Resumed` event pair around each
/// wait. Terminal failures return immediately with no event and no sleep.
/// An operation that keeps failing transiently is attempted exactly
/// `max_attempts + 1` times before its last error is returned.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sink: &StatusSink,
    mut operation: F,
) -> Result<T, ApiFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiFailure>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.is_transient() && attempt < policy.max_attempts => {
                attempt += 1;
                tracing::info!("transient failure ({failure}), attempt {attempt}/{}", policy.max_attempts);
                sink.emit(ProgressEvent::RetryWait {
                    attempt,
                    max_attempts: policy.max_attempts,
                    delay_secs: policy.delay.as_secs(),
                });
                tokio::time::sleep(policy.delay).await;
                sink.emit(ProgressEvent::Resumed {
                    attempt,
                    max_attempts: policy.max_attempts,
                });
            }
            Err(failure) => return Err(failure),
        }
    }
}
