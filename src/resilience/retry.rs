use std::fmt::Display;

use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::RetryConfig;
use crate::utils::constants::*;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl From<&Option<RetryConfig>> for RetrySettings {
    fn from(retry: &Option<RetryConfig>) -> Self {
        let defaults = RetrySettings::default();
        Self {
            attempts: retry.as_ref().and_then(|r| r.attempts).unwrap_or(defaults.attempts),
            base_delay_ms: retry.as_ref().and_then(|r| r.base_delay_ms).unwrap_or(defaults.base_delay_ms),
            max_delay_ms: retry.as_ref().and_then(|r| r.max_delay_ms).unwrap_or(defaults.max_delay_ms),
        }
    }
}

impl RetrySettings {
    /// Doubled delay, capped at `max_delay_ms`.
    fn next_delay(&self, delay_ms: u64) -> u64 {
        delay_ms.saturating_mul(2).min(self.max_delay_ms)
    }

    pub async fn run_with_retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn settings(attempts: u32) -> RetrySettings {
        RetrySettings { attempts, base_delay_ms: 100, max_delay_ms: 300 }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = settings(3)
            .run_with_retry(move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err("transient".to_owned()),
                    n => Ok(n),
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_configured_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = settings(2)
            .run_with_retry(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_owned())
            })
            .await;

        assert_eq!(result, Err("down".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _: Result<(), String> = settings(0)
            .run_with_retry(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_owned())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_doubles_up_to_cap_without_overflow() {
        let retry = settings(3);
        assert_eq!(retry.next_delay(100), 200);
        assert_eq!(retry.next_delay(200), 300);

        let huge = RetrySettings { attempts: 3, base_delay_ms: u64::MAX / 2 + 1, max_delay_ms: u64::MAX };
        assert_eq!(huge.next_delay(huge.base_delay_ms), u64::MAX);
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let partial = Some(RetryConfig { attempts: Some(5), base_delay_ms: None, max_delay_ms: None });
        let retry = RetrySettings::from(&partial);
        assert_eq!(retry.attempts, 5);
        assert_eq!(retry.base_delay_ms, DEFAULT_RETRY_BASE_DELAY_MS);
        assert_eq!(retry.max_delay_ms, DEFAULT_RETRY_MAX_DELAY_MS);
    }
}
