use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Metadata fetch metrics
    pub metadata_requests: IntCounterVec,
    pub metadata_failures: IntCounterVec,
    pub metadata_duration: HistogramVec,

    // Refresh lifecycle
    pub refresh_total: IntCounterVec,
    pub refresh_consecutive_failures: IntGauge,
    pub snapshot_generation: IntGauge,
    pub snapshot_expiry_unix: IntGauge,
    pub next_refresh_unix: IntGauge,

    // Runtime
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("imdsagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Metadata
            metadata_requests: IntCounterVec::new(Opts::new("metadata_requests_total", "Total metadata requests by step"), &["step"]).unwrap(),
            metadata_failures: IntCounterVec::new(Opts::new("metadata_failures_total", "Metadata request failures by step and reason"), &["step", "reason"]).unwrap(),
            metadata_duration: HistogramVec::new(HistogramOpts::new("metadata_request_duration_seconds", "Metadata request duration seconds").buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]), &["step"]).unwrap(),

            // Refresh
            refresh_total: IntCounterVec::new(Opts::new("refresh_total", "Fetch cycles by trigger and outcome"), &["trigger", "outcome"]).unwrap(),
            refresh_consecutive_failures: IntGauge::new("refresh_consecutive_failures", "Scheduled refreshes failed in a row").unwrap(),
            snapshot_generation: IntGauge::new("snapshot_generation", "Generation of the served credential snapshot").unwrap(),
            snapshot_expiry_unix: IntGauge::new("snapshot_expiry_unix_seconds", "Expiration of the served credential snapshot").unwrap(),
            next_refresh_unix: IntGauge::new("next_refresh_unix_seconds", "When the next refresh attempt is scheduled").unwrap(),

            up: IntGauge::new("up", "1 if credentials are being served").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.metadata_requests.clone())).unwrap();
        reg.register(Box::new(metrics.metadata_failures.clone())).unwrap();
        reg.register(Box::new(metrics.metadata_duration.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_total.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_consecutive_failures.clone())).unwrap();
        reg.register(Box::new(metrics.snapshot_generation.clone())).unwrap();
        reg.register(Box::new(metrics.snapshot_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.next_refresh_unix.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
