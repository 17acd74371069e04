// Status, health and metrics routes served over a credential handle.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde_json::Value;
use tokio::time::sleep;

use crate::config::settings::SettingsConfig;
use crate::helpers::time::RefreshTimings;
use crate::manager::CredentialManager;
use crate::resilience::retry::RetrySettings;
use crate::server::server::build_router;
use crate::tests::common::{build_reqwest_client, spawn_axum, ScriptedSource, Step};

fn settings_with_metrics() -> SettingsConfig {
    let mut settings = SettingsConfig::default();
    settings.metrics.is_enabled = true;
    settings
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reports_public_fields_only() {
    let source = ScriptedSource::new(vec![Step::ok("AKIASTATUS")]);
    let manager = CredentialManager::start(source, RefreshTimings::default(), RetrySettings::default()).await.unwrap();
    let (server, addr) = spawn_axum(build_router(&settings_with_metrics(), manager.handle()).await).await;
    let client = build_reqwest_client();

    let res = client.get(format!("http://{}/status", addr)).send().await.unwrap();
    assert!(res.status().is_success(), "unexpected status: {}", res.status());
    let body = res.text().await.unwrap();
    assert!(!body.contains("AKIASTATUS-secret"), "secret leaked: {body}");
    assert!(!body.contains("AKIASTATUS-token"), "session token leaked: {body}");

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["state"], "ready");
    assert_eq!(json["generation"], 1);
    assert_eq!(json["credentials"]["access_key_id"], "AKIASTATUS");
    assert_eq!(json["credentials"]["region"], "us-east-1");
    assert_eq!(json["credentials"]["has_session_token"], true);
    assert_eq!(json["expired"], false);
    assert_eq!(json["last_error"], Value::Null);
    assert!(json["next_refresh_at"].is_string());

    server.abort();
    manager.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_and_metrics_routes() {
    let source = ScriptedSource::new(vec![Step::ok("AKIAHEALTH")]);
    let manager = CredentialManager::start(source, RefreshTimings::default(), RetrySettings::default()).await.unwrap();
    let (server, addr) = spawn_axum(build_router(&settings_with_metrics(), manager.handle()).await).await;
    let client = build_reqwest_client();

    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("imdsagent_up"), "{body}");
    assert!(body.contains("imdsagent_snapshot_expiry_unix_seconds"), "{body}");

    server.abort();
    manager.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_fails_once_credentials_expired() {
    // short-lived credentials; every refresh after the first fetch fails
    let source = ScriptedSource::new(vec![Step::Succeed {
        key: "AKIASHORT".into(),
        ttl: ChronoDuration::seconds(2),
    }]);
    let retry = RetrySettings { attempts: 1, base_delay_ms: 10, max_delay_ms: 10 };
    let manager = CredentialManager::start(source, RefreshTimings::default(), retry).await.unwrap();
    let (server, addr) = spawn_axum(build_router(&SettingsConfig::default(), manager.handle()).await).await;
    let client = build_reqwest_client();

    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    sleep(Duration::from_millis(2500)).await;
    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 503);

    let status: Value = client.get(format!("http://{}/status", addr)).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["expired"], true);
    assert_eq!(status["credentials"]["access_key_id"], "AKIASHORT");
    assert!(status["last_error"].is_string());

    // metrics route is off by default
    let res = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 404);

    server.abort();
    manager.stop().await;
}
