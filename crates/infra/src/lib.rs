//! Infrastructure layer: product store backends and configuration.

pub mod config;
pub mod product_store;

pub use config::{CatalogConfig, ConfigError, StorageConfig};
pub use product_store::{InMemoryProductStore, PostgresProductStore};

#[cfg(test)]
mod integration_tests;

#[cfg(test)]
pub(crate) mod test_support;
