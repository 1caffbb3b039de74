//! Persisted-record shapes.
//!
//! These mirror the storage layout: a `product` row with its category as a
//! plain string, and `product_image` rows pointing back at the product through
//! `product_id`. Nothing enforces that pointer; readers filter by equality.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use catalog_core::{ImageId, ProductId};

/// A stored `product` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A `product` row before the storage engine has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductRecord {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewProductRecord {
    pub fn with_id(self, id: ProductId) -> ProductRecord {
        ProductRecord {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            active: self.active,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// A stored `product_image` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImageRecord {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A `product_image` row before the storage engine has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub product_id: ProductId,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewImageRecord {
    pub fn with_id(self, id: ImageId) -> ProductImageRecord {
        ProductImageRecord {
            id,
            product_id: self.product_id,
            url: self.url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
