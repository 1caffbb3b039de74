//! Image collection rules.
//!
//! A product's images are never diffed. Writes always go through a
//! [`ImageReplacement`]: drop every row owned by the product, then insert the
//! full incoming list in order. Reads attach images by `product_id` equality
//! against whatever row set the caller fetched.

use chrono::{DateTime, Utc};

use catalog_core::{ImageId, ProductId};

use crate::product::ProductImage;
use crate::record::{NewImageRecord, ProductImageRecord};

/// The complete image write for one product.
///
/// Applying it means: delete all rows whose `product_id` equals
/// `product_id`, then insert `rows` in order. Both steps belong to the same
/// transaction as the product row write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReplacement {
    pub product_id: ProductId,
    pub rows: Vec<NewImageRecord>,
}

impl ImageReplacement {
    /// Image rows for a freshly created product.
    ///
    /// Nothing exists to delete yet; rows carry `created_at = now` and no
    /// `updated_at`.
    pub fn for_create(
        product_id: ProductId,
        images: Option<&[ProductImage]>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            rows: rows_for(product_id, images, now, None),
        }
    }

    /// Image rows replacing the whole collection of an existing product.
    ///
    /// An absent or empty incoming collection leaves the product with zero
    /// images.
    pub fn for_update(
        product_id: ProductId,
        images: Option<&[ProductImage]>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            rows: rows_for(product_id, images, now, Some(now)),
        }
    }

    /// The rows to insert, with ids allocated through `next_id` in order.
    ///
    /// The caller still has to drop the product's previous rows.
    pub fn into_rows(self, mut next_id: impl FnMut() -> ImageId) -> Vec<ProductImageRecord> {
        self.rows
            .into_iter()
            .map(|r| r.with_id(next_id()))
            .collect()
    }
}

fn rows_for(
    product_id: ProductId,
    images: Option<&[ProductImage]>,
    now: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
) -> Vec<NewImageRecord> {
    images
        .unwrap_or_default()
        .iter()
        .map(|image| NewImageRecord {
            product_id,
            url: image.url.clone(),
            created_at: now,
            updated_at,
        })
        .collect()
}

/// Rows belonging to `product_id`, in the order they appear in `rows`.
pub fn images_of(
    product_id: ProductId,
    rows: &[ProductImageRecord],
) -> impl Iterator<Item = &ProductImageRecord> {
    rows.iter().filter(move |r| r.product_id == product_id)
}
