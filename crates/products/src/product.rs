use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, ProductId};

/// Closed set of catalog categories.
///
/// Persisted and transferred as its upper-case token; any other token is
/// invalid rather than a new category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Snack,
    Drink,
    Side,
    Dessert,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Snack,
        Category::Drink,
        Category::Side,
        Category::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Snack => "SNACK",
            Category::Drink => "DRINK",
            Category::Side => "SIDE",
            Category::Dessert => "DESSERT",
        }
    }

    /// Decode a category token. Total: every input either maps to a member or
    /// yields a validation error naming the rejected token.
    pub fn parse(token: &str) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == token)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown category '{token}' (expected one of: SNACK, DRINK, SIDE, DESSERT)"
                ))
            })
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Non-negative fixed-point price with at most two decimal places and at
/// most ten integer digits (the `NUMERIC(12, 2)` column range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    pub const MAX_SCALE: u32 = 2;
    pub const MAX_INTEGER_DIGITS: u32 = 10;

    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "price cannot be negative (got {amount})"
            )));
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(DomainError::validation(format!(
                "price cannot have more than {} decimal places (got {amount})",
                Self::MAX_SCALE
            )));
        }
        if amount.trunc() >= Decimal::from(10i64.pow(Self::MAX_INTEGER_DIGITS)) {
            return Err(DomainError::validation(format!(
                "price cannot exceed {} integer digits (got {amount})",
                Self::MAX_INTEGER_DIGITS
            )));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

/// An image attached to a product. Images are plain values: two images with
/// the same URL are the same image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductImage {
    pub url: String,
}

impl ProductImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Catalog product (domain shape).
///
/// `id` and `created_at` are `None` until the product has been persisted once.
/// `images` is `None` when no image collection was supplied at all, which is
/// distinct from an explicitly empty collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: Option<ProductId>,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub images: Option<Vec<ProductImage>>,
}

impl Product {
    /// A not-yet-persisted product with the given catalog fields.
    pub fn draft(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        category: Category,
        images: Vec<ProductImage>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            price,
            category,
            active: true,
            created_at: None,
            updated_at: None,
            images: Some(images),
        }
    }

    /// Image URLs in collection order (empty when the collection is absent).
    pub fn image_urls(&self) -> Vec<&str> {
        self.images
            .iter()
            .flatten()
            .map(|i| i.url.as_str())
            .collect()
    }
}
