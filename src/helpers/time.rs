use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::settings::RefreshConfig;

/// Durations of the refresh cycle, resolved from [`RefreshConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RefreshTimings {
    pub safety_margin: Duration,
    pub min_refresh_delay: Duration,
    pub failure_retry_base: Duration,
    pub failure_retry_max: Duration,
}

impl From<&RefreshConfig> for RefreshTimings {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            safety_margin: Duration::from_secs(config.safety_margin_seconds),
            min_refresh_delay: Duration::from_secs(config.min_refresh_delay_seconds),
            failure_retry_base: Duration::from_secs(config.failure_retry_base_seconds),
            failure_retry_max: Duration::from_secs(config.failure_retry_max_seconds),
        }
    }
}

impl Default for RefreshTimings {
    fn default() -> Self {
        Self::from(&RefreshConfig::default())
    }
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}


pub fn get_instant() -> Instant {
    Instant::now()
}

/// Wall-clock time `delay` from now, used for reporting only.
pub fn utc_after(delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now_utc().checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
