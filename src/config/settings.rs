use std::time::Duration;

use serde::Deserialize;

use crate::utils::constants::*;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Metadata service endpoint
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,
    #[serde(default = "default_metadata_timeout_ms")]
    pub timeout_ms: u64,
    /// request a session token (PUT /latest/api/token) before every fetch cycle
    #[serde(default)]
    pub imds_v2: bool,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_base_url(),
            timeout_ms: default_metadata_timeout_ms(),
            imds_v2: false,
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// ================================
/// Refresh scheduling
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    /// refresh is scheduled this long before credential expiration
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: u64,
    /// floor for the computed refresh delay
    #[serde(default = "default_min_refresh_delay_seconds")]
    pub min_refresh_delay_seconds: u64,
    /// first retry delay after a failed scheduled refresh, doubled per failure
    #[serde(default = "default_failure_retry_base_seconds")]
    pub failure_retry_base_seconds: u64,
    /// invariant: >= failure_retry_base_seconds
    #[serde(default = "default_failure_retry_max_seconds")]
    pub failure_retry_max_seconds: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            safety_margin_seconds: default_safety_margin_seconds(),
            min_refresh_delay_seconds: default_min_refresh_delay_seconds(),
            failure_retry_base_seconds: default_failure_retry_base_seconds(),
            failure_retry_max_seconds: default_failure_retry_max_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// max delay for retrying
    /// invariant: >= base_delay_ms.
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(default_log_level(), default_log_format())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metadata_base_url() -> String {
    DEFAULT_METADATA_BASE_URL.to_string()
}

fn default_metadata_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_token_ttl_seconds() -> u64 {
    DEFAULT_IMDS_TOKEN_TTL_SECS
}

fn default_safety_margin_seconds() -> u64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

fn default_min_refresh_delay_seconds() -> u64 {
    DEFAULT_MIN_REFRESH_DELAY_SECS
}

fn default_failure_retry_base_seconds() -> u64 {
    DEFAULT_FAILURE_RETRY_BASE_SECS
}

fn default_failure_retry_max_seconds() -> u64 {
    DEFAULT_FAILURE_RETRY_MAX_SECS
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> String {
    "8080".to_string()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
