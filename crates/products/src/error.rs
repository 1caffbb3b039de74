//! Catalog error taxonomy shared by stores, the service and the transport edge.

use thiserror::Error;

use catalog_core::{DomainError, ProductId};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failure of a catalog operation.
///
/// Stores surface `NotFound` and `Storage` unmodified; the mapper contributes
/// `Validation` and `DataIntegrity`. Nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The addressed product id does not exist (active or not).
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// Caller-supplied data is malformed (unknown category token, negative price, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A stored record no longer decodes into the domain model.
    #[error("data integrity violated: {0}")]
    DataIntegrity(String),

    /// The storage engine failed (connectivity, constraint violation, ...).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DomainError> for CatalogError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(format!("invalid identifier: {msg}")),
            DomainError::DataIntegrity(msg) => Self::DataIntegrity(msg),
        }
    }
}
