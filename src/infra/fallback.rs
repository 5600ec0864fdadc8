//! Ordered-candidate fallback with rate-limit backoff.
//!
//! Identification backends and price sources share the same failure shape:
//! a static ordered list of interchangeable identities, each of which may
//! throttle (worth retrying in place) or break (worth moving on). The one
//! loop here serves every call site.

use std::future::Future;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::RetryPolicy;

/// How one backend call went wrong, as seen by the controller.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transient throttling; the same backend is worth another attempt.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Structural failure; move on to the next candidate.
    #[error("{0}")]
    Failed(String),
}

/// Every candidate was tried without a usable answer.
#[derive(Debug, Error)]
#[error("all {attempted} backends exhausted: {last_detail}")]
pub struct Exhausted {
    pub attempted: usize,
    pub last_detail: String,
}

/// Invokes `call` with each candidate in order and returns the first output
/// that `accept` deems a real answer.
///
/// A rate-limit error retries the *same* candidate up to
/// `retry.max_attempts` total calls with `retry.pause` in between; any other
/// error, or a rejected output, falls through to the next candidate. Errors
/// never escape: exhaustion carries the last observed detail instead.
pub async fn first_accepted<C, T, F, Fut, A>(
    candidates: &[C],
    retry: &RetryPolicy,
    mut call: F,
    mut accept: A,
) -> Result<T, Exhausted>
where
    C: Clone,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
    A: FnMut(&T) -> bool,
{
    let mut last_detail = String::from("no candidates configured");

    for candidate in candidates {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call(candidate.clone()).await {
                Ok(value) if accept(&value) => return Ok(value),
                Ok(_) => {
                    last_detail = "backend answered without a usable result".to_string();
                    break;
                }
                Err(BackendError::RateLimited(detail)) if attempt < retry.max_attempts => {
                    debug!("[fallback] rate limited, retrying same backend (attempt {attempt}): {detail}");
                    tokio::time::sleep(retry.pause).await;
                }
                Err(error) => {
                    warn!("[fallback] backend failed: {error}");
                    last_detail = error.to_string();
                    break;
                }
            }
        }
    }

    Err(Exhausted {
        attempted: candidates.len(),
        last_detail,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            pause: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn returns_the_first_accepted_answer_and_stops() {
        let calls = AtomicUsize::new(0);
        let backends = ["a", "b", "c"];

        let result = first_accepted(
            &backends,
            &policy(),
            |backend| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match backend {
                        "a" => Err(BackendError::Failed("down".to_string())),
                        "b" => Ok(Vec::<String>::new()),
                        _ => Ok(vec!["answer".to_string()]),
                    }
                }
            },
            |candidates| !candidates.is_empty(),
        )
        .await
        .unwrap();

        assert_eq!(result, vec!["answer".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_retries_the_same_backend_before_moving_on() {
        let calls = AtomicUsize::new(0);
        let backends = ["only"];

        let result = first_accepted(
            &backends,
            &policy(),
            |_backend| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(BackendError::RateLimited("429".to_string()))
                    } else {
                        Ok(42_u32)
                    }
                }
            },
            |_| true,
        )
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_budget_is_bounded_per_backend() {
        let calls = AtomicUsize::new(0);
        let backends = ["first", "second"];

        let result: Result<u32, Exhausted> = first_accepted(
            &backends,
            &policy(),
            |_backend| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(BackendError::RateLimited("429".to_string())) }
            },
            |_| true,
        )
        .await;

        let error = result.unwrap_err();
        // max_attempts calls per backend, then fall through.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(error.attempted, 2);
        assert!(error.last_detail.contains("429"));
    }

    #[tokio::test]
    async fn exhaustion_carries_the_last_error_detail() {
        let backends = ["a", "b"];

        let result: Result<u32, Exhausted> = first_accepted(
            &backends,
            &policy(),
            |backend| async move { Err(BackendError::Failed(format!("{backend} broke"))) },
            |_| true,
        )
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.attempted, 2);
        assert_eq!(error.last_detail, "b broke");
    }

    #[tokio::test]
    async fn empty_candidate_list_is_exhausted_immediately() {
        let backends: [&str; 0] = [];

        let result: Result<u32, Exhausted> =
            first_accepted(&backends, &policy(), |_| async { Ok(1) }, |_| true).await;

        assert!(result.is_err());
    }
}
