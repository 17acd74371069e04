//! # IMDS Credential Agent Library
//!
//! Keeps a set of instance-role credentials fresh in memory: fetches them
//! from the instance metadata service, serves an immutable snapshot to any
//! number of readers and refreshes it ahead of expiry.
//!
//! Modules:
//! - `sources`: metadata service fetcher and its error taxonomy
//! - `cache`: credential snapshot and refresh schedule arithmetic
//! - `manager`: credential lifecycle manager and reader handles
//! - `config`: service configuration, loading and validation
//! - `server`: status, health and metrics routes

pub mod cache;
pub mod config;
pub mod helpers;
pub mod manager;
pub mod observability;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::snapshot::CredentialSnapshot;
pub use crate::manager::{CredentialHandle, CredentialManager, ManagerState, ManagerStatus};
pub use crate::sources::error::{CredentialError, MetadataError};
pub use crate::sources::metadata::MetadataFetcher;
