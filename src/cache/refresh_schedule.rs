use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::cache::snapshot::CredentialSnapshot;

/// When the next refresh of a snapshot is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub refresh_at: DateTime<Utc>,
}

impl RefreshSchedule {
    /// `refresh_at = expires_at - safety_margin`
    pub fn for_snapshot(snapshot: &CredentialSnapshot, safety_margin: Duration) -> Self {
        Self::for_expiry(snapshot.expires_at, safety_margin)
    }

    pub fn for_expiry(expires_at: DateTime<Utc>, safety_margin: Duration) -> Self {
        let margin = chrono::Duration::from_std(safety_margin).unwrap_or(chrono::Duration::MAX);
        let refresh_at = expires_at.checked_sub_signed(margin).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { refresh_at }
    }

    /// Delay until `refresh_at`, never shorter than `min_delay`.
    ///
    /// A snapshot that is already inside its margin (or already expired)
    /// still gets an almost immediate refresh instead of a negative delay.
    pub fn delay_from(&self, now: DateTime<Utc>, min_delay: Duration) -> Duration {
        (self.refresh_at - now)
            .to_std()
            .map(|delay| delay.max(min_delay))
            .unwrap_or(min_delay)
    }
}

/// Bounded exponential backoff for failed scheduled refreshes.
///
/// `consecutive_failures` starts at 1 for the first failure.
pub fn failure_retry_delay(consecutive_failures: u32, base: Duration, max: Duration) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(max)
}
