use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a started credential manager.
///
/// A manager only exists once its first fetch succeeded, so the states
/// before that point are never observable through a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Ready,
    /// a fetch cycle is in flight; readers keep getting the last snapshot
    Refreshing,
    Stopped,
}

/// Observable bookkeeping of the refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub state: ManagerState,
    /// incremented for every committed snapshot, starts at 1
    pub generation: u64,
    pub last_refresh_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
    pub next_refresh_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl ManagerStatus {
    pub(crate) fn ready(refreshed_at: DateTime<Utc>, next_refresh_at: DateTime<Utc>) -> Self {
        Self {
            state: ManagerState::Ready,
            generation: 1,
            last_refresh_at: refreshed_at,
            last_attempt_at: refreshed_at,
            next_refresh_at: Some(next_refresh_at),
            last_error: None,
            consecutive_failures: 0,
        }
    }
}
