//! Transfer shapes exchanged with the transport layer.
//!
//! The same shape serves as request body (`ProductInput`) and response body
//! (`ProductView`). `category` stays a raw token here; it is decoded into
//! [`crate::Category`] by the mapper so unknown tokens surface as validation
//! failures instead of deserialization noise.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImageDto {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ProductImageDto>>,
}

/// Request body for create/update.
pub type ProductInput = ProductDto;

/// Response body for every read or write.
pub type ProductView = ProductDto;

fn default_active() -> bool {
    true
}
