//! Error types for `apiscan-catalog`.

use thiserror::Error;

/// Main error type for catalog operations.
///
/// `ProductNotFound` and `ApiNotFound` are lookup misses against an otherwise healthy catalog;
/// `Upstream` covers everything that went wrong talking to the remote service.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Configuration errors (invalid base URL, zero page size, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success status, transport failure, timeout or malformed body from the catalog service.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// No product with this exact name exists in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No API of the product has a summary containing the requested interface name.
    #[error("API not found: '{interface}' in product '{product}'")]
    ApiNotFound { product: String, interface: String },

    #[error("Configuration error: failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// True for lookup misses (as opposed to transport or configuration failures).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::ProductNotFound(_) | CatalogError::ApiNotFound { .. }
        )
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
