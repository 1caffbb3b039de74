//! Product application service.
//!
//! Each public operation is one mapper call, one store call and one mapper
//! call back. There are no business rules here beyond that sequencing; the
//! store owns persistence semantics and the mapper owns validation.

use tracing::{debug, instrument, warn};

use catalog_core::ProductId;

use crate::dto::{ProductInput, ProductView};
use crate::error::{CatalogError, CatalogResult};
use crate::mapper;
use crate::product::Category;
use crate::store::ProductStore;

#[derive(Debug, Clone)]
pub struct ProductService<S> {
    store: S,
}

impl<S> ProductService<S>
where
    S: ProductStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self, input), fields(category = %input.category), err)]
    pub async fn create_product(&self, input: ProductInput) -> CatalogResult<ProductView> {
        let product = mapper::dto_to_domain(input)?;
        let created = self.store.create(product).await.inspect_err(log_store_error)?;
        debug!(product_id = ?created.id, "product created");
        Ok(mapper::domain_to_dto(created))
    }

    /// Fetch one product. A missing id is reported as `Ok(None)`.
    #[instrument(skip(self), err)]
    pub async fn find_product_by_id(&self, id: ProductId) -> CatalogResult<Option<ProductView>> {
        let found = match self.store.find_by_id(id).await {
            Ok(product) => Some(product),
            Err(CatalogError::NotFound(_)) => {
                debug!("product not found");
                None
            }
            Err(e) => {
                log_store_error(&e);
                return Err(e);
            }
        };
        Ok(mapper::maybe_domain_to_dto(found))
    }

    /// Active products of the category named by `token`.
    ///
    /// Unknown tokens fail with `Validation` before the store is consulted.
    #[instrument(skip(self), err)]
    pub async fn find_products_by_category(&self, token: &str) -> CatalogResult<Vec<ProductView>> {
        let category = Category::parse(token)?;
        let products = self
            .store
            .find_by_category(category)
            .await
            .inspect_err(log_store_error)?;
        debug!(count = products.len(), "category listing");
        Ok(mapper::domain_to_dto_list(products))
    }

    /// Bulk fetch by id; ids without a record are left out.
    #[instrument(skip(self, ids), fields(requested = ids.len()), err)]
    pub async fn find_products_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<ProductView>> {
        let products = self
            .store
            .list_by_ids(ids)
            .await
            .inspect_err(log_store_error)?;
        Ok(mapper::domain_to_dto_list(products))
    }

    #[instrument(skip(self, input), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> CatalogResult<ProductView> {
        let product = mapper::dto_to_domain(input)?;
        let updated = self
            .store
            .update(id, product)
            .await
            .inspect_err(log_store_error)?;
        debug!("product updated");
        Ok(mapper::domain_to_dto(updated))
    }

    #[instrument(skip(self), err)]
    pub async fn disable_product(&self, id: ProductId) -> CatalogResult<()> {
        self.store.disable(id).await.inspect_err(log_store_error)?;
        debug!("product disabled");
        Ok(())
    }
}

fn log_store_error(err: &CatalogError) {
    match err {
        CatalogError::NotFound(id) => debug!(product_id = %id, "product not found"),
        CatalogError::Storage(msg) => warn!("storage failure: {msg}"),
        CatalogError::DataIntegrity(msg) => warn!("stored product failed to decode: {msg}"),
        CatalogError::Validation(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{ProductDto, ProductImageDto};
    use crate::product::Product;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    /// Store double that records calls and answers from a fixed script.
    #[derive(Default)]
    struct ScriptedStore {
        calls: Mutex<Vec<String>>,
        fail_with: Option<CatalogError>,
    }

    impl ScriptedStore {
        fn failing(err: CatalogError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: Some(err),
            }
        }

        fn record(&self, call: impl Into<String>) -> CatalogResult<()> {
            self.calls.lock().unwrap().push(call.into());
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn persisted(mut p: Product, id: i64) -> Product {
        p.id = Some(ProductId::new(id));
        p.active = true;
        p
    }

    #[async_trait::async_trait]
    impl ProductStore for ScriptedStore {
        async fn create(&self, product: Product) -> CatalogResult<Product> {
            self.record("create")?;
            Ok(persisted(product, 1))
        }

        async fn list_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<Product>> {
            self.record(format!("list_by_ids:{}", ids.len()))?;
            Ok(vec![])
        }

        async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product> {
            self.record(format!("find_by_id:{id}"))?;
            Err(CatalogError::NotFound(id))
        }

        async fn find_by_category(&self, category: Category) -> CatalogResult<Vec<Product>> {
            self.record(format!("find_by_category:{category}"))?;
            Ok(vec![])
        }

        async fn update(&self, id: ProductId, product: Product) -> CatalogResult<Product> {
            self.record(format!("update:{id}"))?;
            Ok(persisted(product, id.get()))
        }

        async fn disable(&self, id: ProductId) -> CatalogResult<()> {
            self.record(format!("disable:{id}"))
        }
    }

    fn input(category: &str) -> ProductDto {
        ProductDto {
            id: None,
            name: "Burger".into(),
            description: String::new(),
            price: Decimal::new(1099, 2),
            category: category.into(),
            active: true,
            created_at: None,
            updated_at: None,
            images: Some(vec![ProductImageDto {
                url: "http://x/a.jpg".into(),
            }]),
        }
    }

    #[tokio::test]
    async fn create_maps_in_and_out_around_one_store_call() {
        let service = ProductService::new(ScriptedStore::default());
        let view = service.create_product(input("SNACK")).await.unwrap();
        assert_eq!(view.id, Some(ProductId::new(1)));
        assert_eq!(view.category, "SNACK");
        assert_eq!(view.images.unwrap()[0].url, "http://x/a.jpg");
        assert_eq!(service.store().calls(), vec!["create"]);
    }

    #[tokio::test]
    async fn invalid_category_never_reaches_the_store() {
        let service = ProductService::new(ScriptedStore::default());

        let err = service.create_product(input("PIZZA")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = service.find_products_by_category("PIZZA").await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = service
            .update_product(ProductId::new(1), input("PIZZA"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert!(service.store().calls().is_empty());
    }

    #[tokio::test]
    async fn find_by_id_turns_not_found_into_absence() {
        let service = ProductService::new(ScriptedStore::default());
        let found = service.find_product_by_id(ProductId::new(42)).await.unwrap();
        assert_eq!(found, None);
        assert_eq!(service.store().calls(), vec!["find_by_id:42"]);
    }

    #[tokio::test]
    async fn find_by_id_propagates_storage_faults() {
        let service =
            ProductService::new(ScriptedStore::failing(CatalogError::storage("connection reset")));
        let err = service.find_product_by_id(ProductId::new(1)).await.unwrap_err();
        assert_eq!(err, CatalogError::Storage("connection reset".into()));
    }

    #[tokio::test]
    async fn update_and_disable_pass_store_errors_through_unchanged() {
        let missing = CatalogError::NotFound(ProductId::new(5));
        let service = ProductService::new(ScriptedStore::failing(missing.clone()));

        let err = service
            .update_product(ProductId::new(5), input("SNACK"))
            .await
            .unwrap_err();
        assert_eq!(err, missing);

        let err = service.disable_product(ProductId::new(5)).await.unwrap_err();
        assert_eq!(err, missing);
    }

    #[tokio::test]
    async fn category_listing_decodes_token_before_store_call() {
        let service = ProductService::new(ScriptedStore::default());
        let items = service.find_products_by_category("DRINK").await.unwrap();
        assert!(items.is_empty());
        assert_eq!(service.store().calls(), vec!["find_by_category:DRINK"]);
    }
}
