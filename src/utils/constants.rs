//! Shared constants and invariants

pub const DEFAULT_METADATA_BASE_URL: &str = "http://169.254.169.254";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_IMDS_TOKEN_TTL_SECS: u64 = 21600;

/// 4 minutes before expiry
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 240;
pub const DEFAULT_MIN_REFRESH_DELAY_SECS: u64 = 1;
pub const DEFAULT_FAILURE_RETRY_BASE_SECS: u64 = 30;
pub const DEFAULT_FAILURE_RETRY_MAX_SECS: u64 = 60;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1000;

// Metadata service paths
pub const ROLE_LISTING_PATH: &str = "/latest/meta-data/iam/security-credentials/";
pub const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
pub const IMDS_TOKEN_PATH: &str = "/latest/api/token";
pub const IMDS_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
pub const IMDS_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
