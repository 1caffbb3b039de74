//! Product store backends.
//!
//! Both backends implement [`catalog_products::ProductStore`] and share the
//! write policies from `catalog_products::store`, so they differ only in how
//! rows are kept and how transactions are delimited.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryProductStore;
pub use postgres::PostgresProductStore;
