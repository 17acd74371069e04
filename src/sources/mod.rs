/// Sources module
///
/// The instance metadata fetcher, its error taxonomy and the fetch seam
/// used by the credential manager.
pub mod error;
pub mod fetch;
pub mod metadata;
