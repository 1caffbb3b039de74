//! Products domain module (catalog).
//!
//! This crate contains the catalog rules: the product model, the three-shape
//! mapping (transfer / domain / persisted), image replacement, the store
//! contract with its write policies, and the orchestrating service. Storage
//! backends live in `catalog-infra`; HTTP lives in `catalog-api`.

pub mod dto;
pub mod error;
pub mod images;
pub mod mapper;
pub mod product;
pub mod record;
pub mod service;
pub mod store;

pub use dto::{ProductDto, ProductImageDto, ProductInput, ProductView};
pub use error::{CatalogError, CatalogResult};
pub use images::ImageReplacement;
pub use product::{Category, Price, Product, ProductImage};
pub use record::{NewImageRecord, NewProductRecord, ProductImageRecord, ProductRecord};
pub use service::ProductService;
pub use store::{Mutation, ProductStore};
