use std::future::Future;

use crate::cache::snapshot::CredentialSnapshot;
use crate::sources::error::MetadataError;

/// One complete fetch cycle producing a fresh snapshot.
///
/// Implemented by [`MetadataFetcher`](crate::sources::metadata::MetadataFetcher);
/// the credential manager only depends on this trait.
pub trait CredentialSource {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<CredentialSnapshot, MetadataError>> + Send;
}
