use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cache::refresh_schedule::failure_retry_delay;
use crate::cache::snapshot::CredentialSnapshot;
use crate::helpers::time::{get_instant, now_utc, utc_after, RefreshTimings};
use crate::manager::Shared;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::error::MetadataError;
use crate::sources::fetch::CredentialSource;
use crate::utils::constants::ROLE_LISTING_PATH;

static TRIGGER_SCHEDULED: &str = "scheduled";
static SUCCESS_MSG: &str = "success";
static FAILURE_MSG: &str = "failure";

/// One fetch sequence with in-cycle retries.
///
/// Credentials that are already expired count as a malformed response, so
/// they are never committed over a valid snapshot.
pub(crate) async fn fetch_cycle<S>(source: &S, retry: &RetrySettings) -> Result<CredentialSnapshot, MetadataError>
where
    S: CredentialSource,
{
    retry
        .run_with_retry(move || async move { reject_expired(source.fetch_snapshot().await?, now_utc()) })
        .await
}

fn reject_expired(snapshot: CredentialSnapshot, now: DateTime<Utc>) -> Result<CredentialSnapshot, MetadataError> {
    if snapshot.is_expired_at(now) {
        return Err(MetadataError::malformed(
            ROLE_LISTING_PATH,
            format!("credentials {} expired at {}", snapshot.access_key_id, snapshot.expires_at),
        ));
    }
    Ok(snapshot)
}

/// Sole writer of the shared snapshot.
///
/// The worker owns the only refresh timer: it sleeps for the current delay,
/// refreshes, computes the next delay and sleeps again. Since the next
/// deadline is only armed once the previous refresh resolved, two refreshes
/// never overlap.
pub(crate) struct RefreshWorker<S> {
    source: S,
    shared: Arc<Shared>,
    timings: RefreshTimings,
    retry: RetrySettings,
}

impl<S> RefreshWorker<S>
where
    S: CredentialSource + Send + Sync + 'static,
{
    pub(crate) fn new(source: S, shared: Arc<Shared>, timings: RefreshTimings, retry: RetrySettings) -> Self {
        Self { source, shared, timings, retry }
    }

    /// Runs until `shutdown` fires or its sender is dropped.
    pub(crate) async fn run(self, first_delay: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut delay = first_delay;
        loop {
            debug!("next credential refresh in {} ms", delay.as_millis());
            let timer = sleep(delay);
            tokio::select! {
                _ = &mut shutdown => break,
                next = async {
                    timer.await;
                    self.refresh().await
                } => delay = next,
            }
        }
        self.shared.mark_stopped();
        debug!("refresh worker exited");
    }

    /// Returns the delay until the next refresh attempt.
    async fn refresh(&self) -> Duration {
        let metrics = get_metrics().await;
        let start = get_instant();
        let generation = self.shared.generation();
        self.shared.begin_refresh();
        info!(generation, "refreshing credentials");

        match fetch_cycle(&self.source, &self.retry).await {
            Ok(snapshot) => {
                let expires_at = snapshot.expires_at;
                let delay = self.shared.commit(snapshot, &self.timings);

                metrics.refresh_total.with_label_values(&[TRIGGER_SCHEDULED, SUCCESS_MSG]).inc();
                metrics.refresh_consecutive_failures.set(0);
                metrics.snapshot_generation.set((generation + 1) as i64);
                metrics.snapshot_expiry_unix.set(expires_at.timestamp());
                metrics.next_refresh_unix.set(utc_after(delay).timestamp());
                info!(
                    generation = generation + 1,
                    %expires_at,
                    "credentials refreshed in {} ms, next refresh in {} seconds",
                    start.elapsed().as_millis(),
                    delay.as_secs()
                );
                delay
            }
            Err(err) => {
                let failures = self.shared.record_failure(&err);
                let delay = failure_retry_delay(failures, self.timings.failure_retry_base, self.timings.failure_retry_max);
                self.shared.schedule_retry(delay);

                metrics.refresh_total.with_label_values(&[TRIGGER_SCHEDULED, FAILURE_MSG]).inc();
                metrics.refresh_consecutive_failures.set(failures as i64);
                metrics.next_refresh_unix.set(utc_after(delay).timestamp());
                if failures > 1 {
                    error!(error = %err, failures, "credential refresh failed again, serving stale snapshot, retry in {} seconds", delay.as_secs());
                } else {
                    warn!(error = %err, "credential refresh failed, serving previous snapshot, retry in {} seconds", delay.as_secs());
                }
                delay
            }
        }
    }
}
