//! Product repository boundary.
//!
//! This module defines the storage-facing contract for catalog products and the
//! pure write policies every backend applies, so the in-memory and SQL stores
//! cannot drift apart on which fields a write preserves.
//!
//! ## Write semantics
//!
//! - `create` forces `active = true` and `created_at = now`, whatever the caller sent.
//! - `update` keeps `id`, `active` and `created_at`, overwrites the catalog
//!   fields, stamps `updated_at` and replaces the image collection wholesale.
//! - `disable` flips `active` to false and stamps `updated_at`; nothing else moves.
//!
//! `update` and `disable` are read-modify-write sequences and must run inside
//! one transaction: a failure halfway leaves the previous state intact.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use catalog_core::ProductId;

use crate::error::CatalogResult;
use crate::images::ImageReplacement;
use crate::product::{Category, Product};
use crate::record::{NewProductRecord, ProductRecord};

/// Durable catalog storage.
///
/// ## Read semantics
///
/// - `find_by_id` and `list_by_ids` ignore the active flag (disabled products
///   stay addressable).
/// - `find_by_category` returns only active products of that category; no
///   match is an empty list, never an error.
/// - Images are attached by `product_id` equality on every read.
#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    /// Persist a new product and its images; returns it with the assigned id.
    async fn create(&self, product: Product) -> CatalogResult<Product>;

    /// Bulk fetch. Ids with no record are skipped.
    async fn list_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<Product>>;

    /// Fetch one product, active or not. `NotFound` on miss.
    async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product>;

    /// Active products of one category.
    async fn find_by_category(&self, category: Category) -> CatalogResult<Vec<Product>>;

    /// Overwrite catalog fields and replace images. `NotFound` on miss.
    async fn update(&self, id: ProductId, product: Product) -> CatalogResult<Product>;

    /// Soft-delete. `NotFound` on miss.
    async fn disable(&self, id: ProductId) -> CatalogResult<()>;
}

#[async_trait::async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn create(&self, product: Product) -> CatalogResult<Product> {
        (**self).create(product).await
    }

    async fn list_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<Product>> {
        (**self).list_by_ids(ids).await
    }

    async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        (**self).find_by_id(id).await
    }

    async fn find_by_category(&self, category: Category) -> CatalogResult<Vec<Product>> {
        (**self).find_by_category(category).await
    }

    async fn update(&self, id: ProductId, product: Product) -> CatalogResult<Product> {
        (**self).update(id, product).await
    }

    async fn disable(&self, id: ProductId) -> CatalogResult<()> {
        (**self).disable(id).await
    }
}

/// Row written by `create`. Caller-supplied `id`, `active` and timestamps are dropped.
pub fn prepare_create(product: &Product, now: DateTime<Utc>) -> NewProductRecord {
    NewProductRecord {
        name: product.name.clone(),
        description: product.description.clone(),
        price: product.price.amount(),
        category: product.category.as_str().to_string(),
        active: true,
        created_at: now,
    }
}

/// A read-modify-write applied to an existing product row.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// Overwrite catalog fields from the given product and replace its images.
    Update(&'a Product),
    /// Soft-delete.
    Disable,
}

impl Mutation<'_> {
    /// The row after the mutation.
    ///
    /// | field         | Update          | Disable   |
    /// |---------------|-----------------|-----------|
    /// | id            | kept            | kept      |
    /// | created_at    | kept            | kept      |
    /// | active        | kept            | `false`   |
    /// | name, description, price, category | overwritten | kept |
    /// | updated_at    | `now`           | `now`     |
    pub fn apply(&self, current: ProductRecord, now: DateTime<Utc>) -> ProductRecord {
        match self {
            Mutation::Update(data) => ProductRecord {
                id: current.id,
                name: data.name.clone(),
                description: data.description.clone(),
                price: data.price.amount(),
                category: data.category.as_str().to_string(),
                active: current.active,
                created_at: current.created_at,
                updated_at: Some(now),
            },
            Mutation::Disable => ProductRecord {
                active: false,
                updated_at: Some(now),
                ..current
            },
        }
    }

    /// Image write that accompanies the mutation, if any.
    pub fn images(&self, id: ProductId, now: DateTime<Utc>) -> Option<ImageReplacement> {
        match self {
            Mutation::Update(data) => Some(ImageReplacement::for_update(
                id,
                data.images.as_deref(),
                now,
            )),
            Mutation::Disable => None,
        }
    }
}
