use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Role credentials as returned by the security-credentials endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RoleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Immutable credential bundle served to readers.
///
/// A snapshot is never edited: every successful fetch cycle builds a new one
/// which replaces the previous one as a whole.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub expires_at: DateTime<Utc>,
    /// when the fetch cycle producing this snapshot completed
    pub fetched_at: DateTime<Utc>,
}

impl CredentialSnapshot {
    pub fn new(credentials: RoleCredentials, region: String, fetched_at: DateTime<Utc>) -> Self {
        Self {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
            region,
            expires_at: credentials.expires_at,
            fetched_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// Public part of the snapshot, safe to log or serve.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            access_key_id: self.access_key_id.clone(),
            region: self.region.clone(),
            expires_at: self.expires_at,
            fetched_at: self.fetched_at,
            has_session_token: self.session_token.is_some(),
        }
    }
}

impl fmt::Debug for CredentialSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSnapshot")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("region", &self.region)
            .field("expires_at", &self.expires_at)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub access_key_id: String,
    pub region: String,
    pub expires_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub has_session_token: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CredentialSnapshot {
        let fetched_at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        CredentialSnapshot::new(
            RoleCredentials {
                access_key_id: "AKIAEXAMPLE".into(),
                secret_access_key: "top-secret".into(),
                session_token: Some("session-abc".into()),
                expires_at: fetched_at + Duration::minutes(10),
            },
            "us-east-1".into(),
            fetched_at,
        )
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("AKIAEXAMPLE"));
        assert!(rendered.contains("us-east-1"));
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("session-abc"));
    }

    #[test]
    fn expiry_and_age_are_relative_to_given_time() {
        let snapshot = sample();
        let later = snapshot.fetched_at + Duration::minutes(3);
        assert!(!snapshot.is_expired_at(later));
        assert_eq!(snapshot.age_at(later), Duration::minutes(3));
        assert!(snapshot.is_expired_at(snapshot.expires_at));
    }

    #[test]
    fn summary_never_carries_the_secret() {
        let summary = serde_json::to_string(&sample().summary()).unwrap();
        assert!(summary.contains("AKIAEXAMPLE"));
        assert!(summary.contains("\"has_session_token\":true"));
        assert!(!summary.contains("top-secret"));
    }
}
