//! Catalog client abstraction.
//!
//! The reconciliation engine talks to the catalog only through the
//! `CatalogClient` trait. `CkanClient` implements it against the CKAN action
//! API; tests use `testing::MockCatalog`.

mod ckan;
mod types;

pub use ckan::CkanClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the catalog.
///
/// "Not found" is not an error: lookups return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The action API answered with a failure.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The catalog does not offer this capability.
    #[error("Operation not supported by this catalog: {0}")]
    Unsupported(String),

    /// Client not configured (invalid API key header, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Read-only view of a catalog used by the reconciliation engine.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Name of this backend for logging.
    fn name(&self) -> &str;

    /// Check that the catalog is reachable and healthy.
    async fn check_status(&self) -> Result<(), CatalogError>;

    /// Fetch an entry by its exact identifier.
    async fn get_entry(&self, identifier: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Search entries by text and/or structured resource-name filter.
    async fn search_entries(&self, query: &EntryQuery) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Search resources directly. Optional capability.
    async fn search_resources(&self, query: &str) -> Result<Vec<Resource>, CatalogError> {
        let _ = query;
        Err(CatalogError::Unsupported("resource search".to_string()))
    }

    /// Fetch a fully-populated resource record. Optional capability.
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>, CatalogError> {
        let _ = id;
        Err(CatalogError::Unsupported("resource lookup".to_string()))
    }

    /// Number of entries in the catalog.
    async fn count_entries(&self) -> Result<usize, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::ApiError {
            status: 403,
            message: "Authorization Error".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 403 - Authorization Error");

        let err = CatalogError::Unsupported("resource search".to_string());
        assert_eq!(
            err.to_string(),
            "Operation not supported by this catalog: resource search"
        );
    }
}
