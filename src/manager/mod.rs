//! Credential lifecycle manager.
//!
//! [`CredentialManager::start`] blocks until the first snapshot is fetched,
//! then hands the refresh timer to a single background worker. Readers use
//! [`CredentialHandle`], which never touches the network and never blocks on
//! an in-flight refresh.

pub mod refresh_loop;
pub mod state;

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Duration as ChronoDuration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::refresh_schedule::RefreshSchedule;
use crate::cache::snapshot::CredentialSnapshot;
use crate::config::settings::SettingsConfig;
use crate::helpers::time::{now_utc, utc_after, RefreshTimings};
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::error::{CredentialError, MetadataError};
use crate::sources::fetch::CredentialSource;
use crate::sources::metadata::MetadataFetcher;

use refresh_loop::RefreshWorker;
pub use state::{ManagerState, ManagerStatus};

/// State shared between the single writer (refresh worker) and all readers
pub(crate) struct Shared {
    snapshot: ArcSwap<CredentialSnapshot>,
    status: watch::Sender<ManagerStatus>,
}

impl Shared {
    /// Builds the shared state around the first snapshot; returns the delay of the first refresh.
    fn new(snapshot: CredentialSnapshot, timings: &RefreshTimings) -> (Arc<Self>, std::time::Duration) {
        let now = now_utc();
        let delay = RefreshSchedule::for_snapshot(&snapshot, timings.safety_margin).delay_from(now, timings.min_refresh_delay);
        let (status, _) = watch::channel(ManagerStatus::ready(now, utc_after(delay)));
        let shared = Arc::new(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            status,
        });
        (shared, delay)
    }

    pub(crate) fn begin_refresh(&self) {
        self.status.send_modify(|status| {
            status.state = ManagerState::Refreshing;
            status.last_attempt_at = now_utc();
        });
    }

    /// Swaps in a new snapshot and returns the delay until its refresh.
    pub(crate) fn commit(&self, snapshot: CredentialSnapshot, timings: &RefreshTimings) -> std::time::Duration {
        let now = now_utc();
        let delay = RefreshSchedule::for_snapshot(&snapshot, timings.safety_margin).delay_from(now, timings.min_refresh_delay);
        self.snapshot.store(Arc::new(snapshot));
        self.status.send_modify(|status| {
            status.state = ManagerState::Ready;
            status.generation += 1;
            status.last_refresh_at = now;
            status.next_refresh_at = Some(utc_after(delay));
            status.last_error = None;
            status.consecutive_failures = 0;
        });
        delay
    }

    /// Records a failed refresh; the served snapshot is left untouched.
    /// Returns the number of consecutive failures so far.
    pub(crate) fn record_failure(&self, err: &MetadataError) -> u32 {
        let mut failures = 0;
        self.status.send_modify(|status| {
            status.state = ManagerState::Ready;
            status.last_error = Some(err.to_string());
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            failures = status.consecutive_failures;
        });
        failures
    }

    pub(crate) fn schedule_retry(&self, delay: std::time::Duration) {
        self.status.send_modify(|status| status.next_refresh_at = Some(utc_after(delay)));
    }

    pub(crate) fn mark_stopped(&self) {
        self.status.send_modify(|status| {
            status.state = ManagerState::Stopped;
            status.next_refresh_at = None;
        });
    }

    pub(crate) fn generation(&self) -> u64 {
        self.status.borrow().generation
    }
}

/// Cheap, clonable read access to the managed credentials.
#[derive(Clone)]
pub struct CredentialHandle {
    shared: Arc<Shared>,
}

impl CredentialHandle {
    /// Last committed snapshot. Never blocks, never fails.
    pub fn snapshot(&self) -> Arc<CredentialSnapshot> {
        self.shared.snapshot.load_full()
    }

    pub fn status(&self) -> ManagerStatus {
        self.shared.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<ManagerStatus> {
        self.shared.status.subscribe()
    }

    /// Time since the served snapshot was fetched; grows past the refresh interval while refreshes fail.
    pub fn snapshot_age(&self) -> ChronoDuration {
        self.snapshot().age_at(now_utc())
    }

    pub fn is_expired(&self) -> bool {
        self.snapshot().is_expired_at(now_utc())
    }

    pub fn last_refresh_error(&self) -> Option<String> {
        self.shared.status.borrow().last_error.clone()
    }
}

/// Owns the refresh worker; dropping the manager stops it as well.
pub struct CredentialManager {
    handle: CredentialHandle,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl CredentialManager {
    /// Fetches the first snapshot and arms the refresh timer.
    ///
    /// Fails with [`CredentialError::Initialization`] when the initial fetch
    /// sequence does not succeed within `retry`; no snapshot is served then.
    pub async fn start<S>(source: S, timings: RefreshTimings, retry: RetrySettings) -> Result<Self, CredentialError>
    where
        S: CredentialSource + Send + Sync + 'static,
    {
        let metrics = get_metrics().await;
        info!("credential manager initializing");

        let snapshot = match refresh_loop::fetch_cycle(&source, &retry).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(error = %err, "initial credential fetch failed, credential manager not started");
                metrics.refresh_total.with_label_values(&["startup", "failure"]).inc();
                metrics.up.set(0);
                return Err(CredentialError::Initialization(err));
            }
        };
        if RefreshSchedule::for_snapshot(&snapshot, timings.safety_margin).refresh_at <= now_utc() {
            warn!(expires_at = %snapshot.expires_at, "initial credentials already inside the safety margin");
        }

        metrics.refresh_total.with_label_values(&["startup", "success"]).inc();
        metrics.snapshot_expiry_unix.set(snapshot.expires_at.timestamp());
        metrics.snapshot_generation.set(1);
        metrics.up.set(1);

        let summary = snapshot.summary();
        let (shared, first_delay) = Shared::new(snapshot, &timings);
        metrics.next_refresh_unix.set(utc_after(first_delay).timestamp());
        info!(
            access_key_id = %summary.access_key_id,
            region = %summary.region,
            expires_at = %summary.expires_at,
            "credential manager ready, next refresh in {} seconds",
            first_delay.as_secs()
        );

        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = RefreshWorker::new(source, shared.clone(), timings, retry);
        let worker = tokio::spawn(worker.run(first_delay, shutdown_rx));

        Ok(Self {
            handle: CredentialHandle { shared },
            shutdown,
            worker,
        })
    }

    /// Starts a manager backed by the instance metadata service described in `settings`.
    pub async fn from_settings(settings: &SettingsConfig) -> Result<Self, CredentialError> {
        let fetcher = MetadataFetcher::new(&settings.metadata).map_err(CredentialError::Initialization)?;
        info!(base_url = %fetcher.base_url(), imds_v2 = settings.metadata.imds_v2, "using instance metadata service");
        Self::start(
            fetcher,
            RefreshTimings::from(&settings.refresh),
            RetrySettings::from(&settings.retry),
        )
        .await
    }

    pub fn handle(&self) -> CredentialHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> Arc<CredentialSnapshot> {
        self.handle.snapshot()
    }

    pub fn status(&self) -> ManagerStatus {
        self.handle.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ManagerStatus> {
        self.handle.subscribe()
    }

    /// Releases the pending timer and waits for the worker to exit.
    /// An in-flight refresh is abandoned.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.worker.await {
            warn!(error = %err, "refresh worker ended abnormally");
            self.handle.shared.mark_stopped();
        }
        get_metrics().await.up.set(0);
        info!("credential manager stopped");
    }
}
