use http::StatusCode;
use thiserror::Error;

/// Failure of a single metadata request.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Connection refused, timeout, broken body stream
    #[error("metadata transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Metadata service answered with a non-success status
    #[error("metadata request to '{url}' returned unexpected status {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    /// Body is missing a required field or a field does not parse
    #[error("malformed metadata response from '{url}': {reason}")]
    MalformedResponse { url: String, reason: String },
}

impl MetadataError {
    pub fn malformed(url: &str, reason: impl Into<String>) -> Self {
        MetadataError::MalformedResponse {
            url: url.to_owned(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            MetadataError::Transport(_) => "transport",
            MetadataError::UnexpectedStatus { .. } => "unexpected_status",
            MetadataError::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// Errors surfaced by the credential manager lifecycle.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The initial fetch sequence failed, the manager never started
    #[error("credential manager initialization failed: {0}")]
    Initialization(#[source] MetadataError),
}
