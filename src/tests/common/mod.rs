// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration as ChronoDuration, Utc};
use http::StatusCode;
use reqwest::Client;
use tokio::sync::Notify;

use crate::cache::snapshot::{CredentialSnapshot, RoleCredentials};
use crate::config::settings::MetadataConfig;
use crate::sources::error::MetadataError;
use crate::sources::fetch::CredentialSource;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn metadata_config(base_url: String) -> MetadataConfig {
    MetadataConfig {
        base_url,
        timeout_ms: 1000,
        ..MetadataConfig::default()
    }
}

/// Snapshot fetched now, expiring after `ttl`; secret and token are derived from the key.
pub fn snapshot(key: &str, ttl: ChronoDuration) -> CredentialSnapshot {
    let now = Utc::now();
    CredentialSnapshot::new(
        RoleCredentials {
            access_key_id: key.to_owned(),
            secret_access_key: format!("{key}-secret"),
            session_token: Some(format!("{key}-token")),
            expires_at: now + ttl,
        },
        "us-east-1".to_owned(),
        now,
    )
}

/// A real `reqwest::Error`, produced without touching the network
pub fn transport_error() -> MetadataError {
    let err = Client::new().get("not a url").build().unwrap_err();
    MetadataError::Transport(err)
}

pub enum Step {
    Succeed { key: String, ttl: ChronoDuration },
    /// succeeds only after `release` is notified
    Blocked { key: String, ttl: ChronoDuration, release: Arc<Notify> },
    Transport,
    Status(StatusCode),
    Malformed(&'static str),
}

impl Step {
    pub fn ok(key: &str) -> Self {
        Step::Succeed { key: key.to_owned(), ttl: ChronoDuration::minutes(10) }
    }
}

/// In-memory credential source replaying a fixed script of outcomes.
#[derive(Clone)]
pub struct ScriptedSource {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialSource for ScriptedSource {
    async fn fetch_snapshot(&self) -> Result<CredentialSnapshot, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Succeed { key, ttl }) => Ok(snapshot(&key, ttl)),
            Some(Step::Blocked { key, ttl, release }) => {
                release.notified().await;
                Ok(snapshot(&key, ttl))
            }
            Some(Step::Transport) => Err(transport_error()),
            Some(Step::Status(status)) => Err(MetadataError::UnexpectedStatus {
                url: "http://imds.test/latest/meta-data/iam/security-credentials/".to_owned(),
                status,
            }),
            Some(Step::Malformed(reason)) => Err(MetadataError::malformed("http://imds.test/creds", reason)),
            None => Err(MetadataError::malformed("http://imds.test/creds", "script exhausted")),
        }
    }
}
