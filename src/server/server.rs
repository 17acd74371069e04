use std::future::Future;

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::manager::CredentialHandle;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::status;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub credentials: CredentialHandle,
}

impl AppState {
    pub fn new(metrics: &Metrics, credentials: CredentialHandle) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            credentials,
        }
    }
}

/// Status, health and (optionally) metrics routes over one credential handle.
pub async fn build_router(settings_config: &SettingsConfig, credentials: CredentialHandle) -> Router {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, credentials);

    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(status::router())
        .with_state(state)
}

/// Serve the status routes until `shutdown` resolves.
pub async fn start<F>(settings_config: &SettingsConfig, credentials: CredentialHandle, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(settings_config, credentials).await;

    let bind_addr = &settings_config.server.host;
    let port = &settings_config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    info!("status server listening on {}:{}", bind_addr, port);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
