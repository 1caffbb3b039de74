//! Conversions between the transfer, domain and persisted shapes of a product.
//!
//! Every function here is pure. Validation happens at the edges:
//! - transfer → domain rejects unknown category tokens, negative prices and
//!   blank names as [`DomainError::Validation`];
//! - persisted → domain rejects unknown stored categories as
//!   [`DomainError::DataIntegrity`], since a bad row is not a caller mistake.

use catalog_core::{DomainError, DomainResult};

use crate::dto::{ProductDto, ProductImageDto};
use crate::images::images_of;
use crate::product::{Category, Price, Product, ProductImage};
use crate::record::{ProductImageRecord, ProductRecord};

// -------------------------
// transfer → domain
// -------------------------

/// Convert a transfer object into the domain shape.
///
/// Scalar fields (including any caller-supplied `id`, `active` and
/// timestamps) are copied as-is; the store decides which of them survive.
pub fn dto_to_domain(dto: ProductDto) -> DomainResult<Product> {
    if dto.name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }

    Ok(Product {
        id: dto.id,
        name: dto.name,
        description: dto.description,
        price: Price::new(dto.price)?,
        category: Category::parse(&dto.category)?,
        active: dto.active,
        created_at: dto.created_at,
        updated_at: dto.updated_at,
        images: dto
            .images
            .map(|images| images.into_iter().map(|i| ProductImage::new(i.url)).collect()),
    })
}

// -------------------------
// persisted → domain
// -------------------------

/// Convert a stored row into the domain shape.
///
/// `images` may hold rows of other products; only those whose `product_id`
/// equals the record's id are attached, in their given order.
pub fn record_to_domain(
    record: ProductRecord,
    images: &[ProductImageRecord],
) -> DomainResult<Product> {
    let category = Category::parse(&record.category).map_err(|_| {
        DomainError::data_integrity(format!(
            "product {} has unknown stored category '{}'",
            record.id, record.category
        ))
    })?;
    let price = Price::new(record.price).map_err(|_| {
        DomainError::data_integrity(format!(
            "product {} has invalid stored price {}",
            record.id, record.price
        ))
    })?;

    let attached = images_of(record.id, images)
        .map(|r| ProductImage::new(r.url.clone()))
        .collect();

    Ok(Product {
        id: Some(record.id),
        name: record.name,
        description: record.description,
        price,
        category,
        active: record.active,
        created_at: Some(record.created_at),
        updated_at: record.updated_at,
        images: Some(attached),
    })
}

/// Element-wise [`record_to_domain`], preserving input order.
pub fn records_to_domain(
    records: Vec<ProductRecord>,
    images: &[ProductImageRecord],
) -> DomainResult<Vec<Product>> {
    records
        .into_iter()
        .map(|record| record_to_domain(record, images))
        .collect()
}

// -------------------------
// domain → transfer
// -------------------------

/// Convert a domain product into its transfer shape.
///
/// An absent image collection stays absent (it is not turned into `[]`).
pub fn domain_to_dto(product: Product) -> ProductDto {
    ProductDto {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price.amount(),
        category: product.category.as_str().to_string(),
        active: product.active,
        created_at: product.created_at,
        updated_at: product.updated_at,
        images: product.images.map(|images| {
            images
                .into_iter()
                .map(|i| ProductImageDto { url: i.url })
                .collect()
        }),
    }
}

/// [`domain_to_dto`] that propagates absence.
pub fn maybe_domain_to_dto(product: Option<Product>) -> Option<ProductDto> {
    product.map(domain_to_dto)
}

/// Element-wise [`domain_to_dto`], preserving input order.
pub fn domain_to_dto_list(products: Vec<Product>) -> Vec<ProductDto> {
    products.into_iter().map(domain_to_dto).collect()
}
