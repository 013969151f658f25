// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with jitter for transient failures.
//!
//! Used for the orchestrator's retry of rate-limited LLM and retrieval
//! calls. Non-transient errors (CAS losses, config errors) never retry.

use std::future::Future;
use std::time::Duration;

use deskpilot_core::DeskpilotError;
use rand::Rng;
use tracing::warn;

const FLOOR_MS: u64 = 200;
const CEILING_MS: u64 = 5_000;
const JITTER: f64 = 0.25;
const MULTIPLIER: f64 = 2.0;

/// Jittered exponential delay for the given 1-based attempt.
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let base = (FLOOR_MS as f64 * MULTIPLIER.powi(attempt as i32 - 1)).min(CEILING_MS as f64);
    let jitter_range = base * JITTER;
    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
    let ms = (base + jitter).clamp(FLOOR_MS as f64, CEILING_MS as f64);
    Duration::from_millis(ms as u64)
}

/// Runs `operation` up to `1 + retries` times, sleeping a jittered
/// exponential delay between attempts. Only transient errors retry.
pub async fn retry_transient<T, F, Fut>(
    retries: u32,
    mut operation: F,
) -> Result<T, DeskpilotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeskpilotError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                let delay = delay_for_attempt(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_within_bounds() {
        for attempt in 1..=6 {
            let d = delay_for_attempt(attempt);
            assert!(d.as_millis() as u64 >= FLOOR_MS);
            assert!(d.as_millis() as u64 <= CEILING_MS);
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(2, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DeskpilotError::Provider {
                        message: "rate limited".into(),
                        source: None,
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DeskpilotError::Config("bad".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let result: Result<(), _> = retry_transient(1, || async {
            Err(DeskpilotError::Provider {
                message: "still down".into(),
                source: None,
            })
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("still down"));
    }
}
