//! Integration tests for the full catalog pipeline.
//!
//! Tests: ProductInput → Mapper → ProductService → InMemoryProductStore → ProductView
//!
//! Verifies:
//! - Create stamps identity fields and keeps image order
//! - Disable is a soft delete visible through category listings
//! - Update replaces the image collection wholesale
//! - Missing ids are NotFound and never mutate storage

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use catalog_core::ProductId;
    use catalog_products::{CatalogError, ProductDto, ProductImageDto, ProductService};

    use crate::product_store::InMemoryProductStore;
    use crate::test_support::StepClock;

    fn setup() -> ProductService<Arc<InMemoryProductStore>> {
        let store = Arc::new(InMemoryProductStore::with_clock(Arc::new(StepClock::new())));
        ProductService::new(store)
    }

    fn input(name: &str, price: Decimal, category: &str, urls: &[&str]) -> ProductDto {
        ProductDto {
            id: None,
            name: name.to_string(),
            description: String::new(),
            price,
            category: category.to_string(),
            active: true,
            created_at: None,
            updated_at: None,
            images: Some(
                urls.iter()
                    .map(|u| ProductImageDto { url: u.to_string() })
                    .collect(),
            ),
        }
    }

    fn urls(view: &ProductDto) -> Vec<String> {
        view.images
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|i| i.url.clone())
            .collect()
    }

    #[tokio::test]
    async fn burger_lifecycle() {
        let service = setup();

        let created = service
            .create_product(input("Burger", Decimal::new(1099, 2), "SNACK", &["http://x/a.jpg"]))
            .await
            .unwrap();
        let id = created.id.expect("assigned id");
        assert!(created.active);
        assert_eq!(urls(&created), vec!["http://x/a.jpg"]);

        let updated = service
            .update_product(id, input("Burger", Decimal::new(1250, 2), "SNACK", &[]))
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::new(1250, 2));
        assert_eq!(updated.images, Some(vec![]));

        service.disable_product(id).await.unwrap();
        let after = service.find_product_by_id(id).await.unwrap().unwrap();
        assert!(!after.active);

        let snacks = service.find_products_by_category("SNACK").await.unwrap();
        assert!(snacks.iter().all(|p| p.id != Some(id)));
    }

    #[tokio::test]
    async fn create_then_find_returns_fresh_active_product() {
        let service = setup();
        let created = service
            .create_product(input("Fries", Decimal::new(500, 2), "SIDE", &["b", "a", "c"]))
            .await
            .unwrap();

        let found = service
            .find_product_by_id(created.id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(found.active);
        assert!(found.created_at.is_some());
        assert_eq!(found.updated_at, None);
        assert_eq!(urls(&found), vec!["b", "a", "c"]);
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn disable_advances_updated_at_and_keeps_the_rest() {
        let service = setup();
        let created = service
            .create_product(input("Pie", Decimal::new(300, 2), "DESSERT", &["p"]))
            .await
            .unwrap();
        let id = created.id.unwrap();

        service.disable_product(id).await.unwrap();
        let first = service.find_product_by_id(id).await.unwrap().unwrap();
        assert!(!first.active);
        assert!(first.updated_at.unwrap() > first.created_at.unwrap());
        assert_eq!(first.name, created.name);
        assert_eq!(first.price, created.price);
        assert_eq!(urls(&first), vec!["p"]);

        service.disable_product(id).await.unwrap();
        let second = service.find_product_by_id(id).await.unwrap().unwrap();
        assert!(!second.active);
        assert!(second.updated_at.unwrap() > first.updated_at.unwrap());
    }

    #[tokio::test]
    async fn update_without_images_clears_the_collection() {
        let service = setup();
        let id = service
            .create_product(input("Soda", Decimal::new(400, 2), "DRINK", &["x", "y"]))
            .await
            .unwrap()
            .id
            .unwrap();

        let mut no_images = input("Soda", Decimal::new(400, 2), "DRINK", &[]);
        no_images.images = None;
        service.update_product(id, no_images).await.unwrap();

        let found = service.find_product_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.images, Some(vec![]));
    }

    #[tokio::test]
    async fn update_keeps_disabled_products_disabled() {
        let service = setup();
        let id = service
            .create_product(input("Tea", Decimal::new(250, 2), "DRINK", &[]))
            .await
            .unwrap()
            .id
            .unwrap();
        service.disable_product(id).await.unwrap();

        let updated = service
            .update_product(id, input("Iced Tea", Decimal::new(275, 2), "DRINK", &[]))
            .await
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.name, "Iced Tea");
    }

    #[tokio::test]
    async fn missing_id_and_empty_category_are_distinguishable() {
        let service = setup();
        service
            .create_product(input("Burger", Decimal::new(1099, 2), "SNACK", &[]))
            .await
            .unwrap();

        let missing = service.find_product_by_id(ProductId::new(999)).await.unwrap();
        assert_eq!(missing, None);

        let desserts = service.find_products_by_category("DESSERT").await.unwrap();
        assert!(desserts.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_id_does_not_touch_other_products() {
        let service = setup();
        let id = service
            .create_product(input("Burger", Decimal::new(1099, 2), "SNACK", &["a"]))
            .await
            .unwrap()
            .id
            .unwrap();
        let before = service.find_product_by_id(id).await.unwrap();

        let err = service
            .update_product(ProductId::new(404), input("Ghost", Decimal::ONE, "SNACK", &["g"]))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound(ProductId::new(404)));

        let err = service.disable_product(ProductId::new(404)).await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(service.find_product_by_id(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn bulk_lookup_returns_existing_products_only() {
        let service = setup();
        let a = service
            .create_product(input("A", Decimal::ONE, "SNACK", &[]))
            .await
            .unwrap()
            .id
            .unwrap();
        let b = service
            .create_product(input("B", Decimal::ONE, "DRINK", &[]))
            .await
            .unwrap()
            .id
            .unwrap();
        service.disable_product(b).await.unwrap();

        let found = service
            .find_products_by_ids(&[a, ProductId::new(77), b])
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id.unwrap()).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
