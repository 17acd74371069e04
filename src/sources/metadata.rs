use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::cache::snapshot::{CredentialSnapshot, RoleCredentials};
use crate::config::settings::MetadataConfig;
use crate::helpers::time::{get_instant, now_utc};
use crate::observability::metrics::get_metrics;
use crate::sources::error::MetadataError;
use crate::sources::fetch::CredentialSource;
use crate::utils::constants::*;

static STEP_TOKEN: &str = "session_token";
static STEP_ROLE: &str = "role_name";
static STEP_CREDENTIALS: &str = "credentials";
static STEP_REGION: &str = "region";

/// Stateless client of the instance metadata service.
///
/// Every call goes to the network; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    base_url: String,
    imds_v2: bool,
    token_ttl_seconds: u64,
}

/// Security-credentials document, field names as served by the metadata service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsDocument {
    code: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    token: Option<String>,
    expiration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityDocument {
    region: Option<String>,
}

impl MetadataFetcher {
    pub fn new(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &MetadataConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            imds_v2: config.imds_v2,
            token_ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_role_name(&self) -> Result<String, MetadataError> {
        self.session().await?.fetch_role_name().await
    }

    pub async fn fetch_credentials(&self, role_name: &str) -> Result<RoleCredentials, MetadataError> {
        self.session().await?.fetch_credentials(role_name).await
    }

    pub async fn fetch_region(&self) -> Result<String, MetadataError> {
        self.session().await?.fetch_region().await
    }

    /// Role name, then role credentials, then region; one session for all three.
    pub async fn fetch_snapshot(&self) -> Result<CredentialSnapshot, MetadataError> {
        let session = self.session().await?;
        let role_name = session.fetch_role_name().await?;
        debug!(role = %role_name, "resolved instance role");
        let credentials = session.fetch_credentials(&role_name).await?;
        let region = session.fetch_region().await?;
        Ok(CredentialSnapshot::new(credentials, region, now_utc()))
    }

    async fn session(&self) -> Result<Session<'_>, MetadataError> {
        let token = match self.imds_v2 {
            true => Some(self.fetch_session_token().await?),
            false => None,
        };
        Ok(Session { fetcher: self, token })
    }

    async fn fetch_session_token(&self) -> Result<String, MetadataError> {
        let url = format!("{}{}", self.base_url, IMDS_TOKEN_PATH);
        let request = self
            .client
            .put(&url)
            .header(IMDS_TOKEN_TTL_HEADER, self.token_ttl_seconds.to_string());
        let body = send_for_text(STEP_TOKEN, &url, request).await?;
        let token = body.trim();
        if token.is_empty() {
            return Err(MetadataError::malformed(&url, "empty session token"));
        }
        Ok(token.to_owned())
    }
}

impl CredentialSource for MetadataFetcher {
    async fn fetch_snapshot(&self) -> Result<CredentialSnapshot, MetadataError> {
        MetadataFetcher::fetch_snapshot(self).await
    }
}

/// Requests sharing one optional IMDSv2 session token
struct Session<'a> {
    fetcher: &'a MetadataFetcher,
    token: Option<String>,
}

impl Session<'_> {
    async fn get(&self, step: &str, url: &str) -> Result<String, MetadataError> {
        let mut request = self.fetcher.client.get(url);
        if let Some(token) = &self.token {
            request = request.header(IMDS_TOKEN_HEADER, token);
        }
        send_for_text(step, url, request).await
    }

    async fn fetch_role_name(&self) -> Result<String, MetadataError> {
        let url = format!("{}{}", self.fetcher.base_url, ROLE_LISTING_PATH);
        let body = self.get(STEP_ROLE, &url).await?;
        parse_role_name(&body).ok_or_else(|| MetadataError::malformed(&url, "no role name in response"))
    }

    async fn fetch_credentials(&self, role_name: &str) -> Result<RoleCredentials, MetadataError> {
        let url = format!("{}{}{}", self.fetcher.base_url, ROLE_LISTING_PATH, role_name);
        let body = self.get(STEP_CREDENTIALS, &url).await?;
        parse_credentials(&url, &body)
    }

    async fn fetch_region(&self) -> Result<String, MetadataError> {
        let url = format!("{}{}", self.fetcher.base_url, IDENTITY_DOCUMENT_PATH);
        let body = self.get(STEP_REGION, &url).await?;
        parse_region(&url, &body)
    }
}

async fn send_for_text(
    step: &str,
    url: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, MetadataError> {
    let metrics = get_metrics().await;
    let start = get_instant();
    metrics.metadata_requests.with_label_values(&[step]).inc();

    let result = async {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::UnexpectedStatus { url: url.to_owned(), status });
        }
        Ok(response.text().await?)
    }
    .await;

    metrics.metadata_duration.with_label_values(&[step]).observe(start.elapsed().as_secs_f64());
    if let Err(err) = &result {
        metrics.metadata_failures.with_label_values(&[step, err.reason()]).inc();
    }
    result
}

fn parse_role_name(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}

fn parse_credentials(url: &str, body: &str) -> Result<RoleCredentials, MetadataError> {
    let document: CredentialsDocument = serde_json::from_str(body)
        .map_err(|e| MetadataError::malformed(url, format!("invalid JSON: {}", e)))?;

    if let Some(code) = document.code.as_deref() {
        if code != "Success" {
            return Err(MetadataError::malformed(url, format!("credentials code '{}'", code)));
        }
    }

    let access_key_id = required(url, "AccessKeyId", document.access_key_id)?;
    let secret_access_key = required(url, "SecretAccessKey", document.secret_access_key)?;
    let expiration = required(url, "Expiration", document.expiration)?;
    let expires_at = DateTime::parse_from_rfc3339(&expiration)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MetadataError::malformed(url, format!("Expiration '{}' is not a timestamp: {}", expiration, e)))?;

    Ok(RoleCredentials {
        access_key_id,
        secret_access_key,
        session_token: document.token.filter(|token| !token.is_empty()),
        expires_at,
    })
}

fn parse_region(url: &str, body: &str) -> Result<String, MetadataError> {
    let document: IdentityDocument = serde_json::from_str(body)
        .map_err(|e| MetadataError::malformed(url, format!("invalid JSON: {}", e)))?;
    required(url, "region", document.region)
}

fn required(url: &str, field: &str, value: Option<String>) -> Result<String, MetadataError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MetadataError::malformed(url, format!("missing field '{}'", field)))
}
