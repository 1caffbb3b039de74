use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::instrument;

use catalog_core::{Clock, ImageId, ProductId, SystemClock};
use catalog_products::store::prepare_create;
use catalog_products::{
    mapper, CatalogError, CatalogResult, Category, ImageReplacement, Mutation, Product,
    ProductImageRecord, ProductRecord, ProductStore,
};

/// Row storage guarded by a single lock.
#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, ProductRecord>,
    images: Vec<ProductImageRecord>,
    last_product_id: i64,
    last_image_id: i64,
}

/// Changes to one product row (and optionally its whole image collection),
/// computed without touching the tables.
#[derive(Debug)]
struct StagedWrite {
    record: ProductRecord,
    images: Option<Vec<ProductImageRecord>>,
    last_image_id: i64,
}

impl StagedWrite {
    /// Image rows to decode the staged product against.
    fn images_or<'a>(&'a self, current: &'a [ProductImageRecord]) -> &'a [ProductImageRecord] {
        self.images.as_deref().unwrap_or(current)
    }
}

impl Tables {
    fn stage(&self, record: ProductRecord, plan: Option<ImageReplacement>) -> StagedWrite {
        let mut last_image_id = self.last_image_id;
        let images = plan.map(|plan| {
            plan.into_rows(|| {
                last_image_id += 1;
                ImageId::new(last_image_id)
            })
        });
        StagedWrite {
            record,
            images,
            last_image_id,
        }
    }

    /// Apply a staged write. Infallible: every check ran while staging.
    fn commit(&mut self, staged: StagedWrite) {
        let id = staged.record.id;
        self.last_product_id = self.last_product_id.max(id.get());
        self.last_image_id = staged.last_image_id;
        self.products.insert(id, staged.record);
        if let Some(images) = staged.images {
            self.images.retain(|r| r.product_id != id);
            self.images.extend(images);
        }
    }
}

/// In-memory product store.
///
/// Intended for tests/dev. Ids come from per-table sequences starting at 1.
/// Writes hold the write lock for the whole operation, stage the rows they
/// touch and commit them only after every fallible step succeeded, so partial
/// writes are never visible.
pub struct InMemoryProductStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }

    fn read(&self, op: &str) -> CatalogResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| CatalogError::storage(format!("lock poisoned in {op}")))
    }

    fn write(&self, op: &str) -> CatalogResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| CatalogError::storage(format!("lock poisoned in {op}")))
    }

    /// Fetch the row, apply the mutation and stage it (with its image
    /// replacement). `finish` sees the staged row and the image rows it will
    /// be read with; the write is committed only if `finish` succeeds.
    fn read_modify_write<T>(
        &self,
        id: ProductId,
        mutation: Mutation<'_>,
        finish: impl FnOnce(ProductRecord, &[ProductImageRecord]) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let now = self.clock.now();
        let mut tables = self.write("read_modify_write")?;

        let current = tables
            .products
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))?;

        let staged = tables.stage(mutation.apply(current, now), mutation.images(id, now));
        let out = finish(staged.record.clone(), staged.images_or(&tables.images))?;
        tables.commit(staged);
        Ok(out)
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InMemoryProductStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryProductStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryProductStore {
    #[instrument(skip(self, product), fields(category = %product.category), err)]
    async fn create(&self, product: Product) -> CatalogResult<Product> {
        let now = self.clock.now();
        let mut tables = self.write("create")?;

        let id = ProductId::new(tables.last_product_id + 1);
        let record = prepare_create(&product, now).with_id(id);
        let plan = ImageReplacement::for_create(id, product.images.as_deref(), now);
        let staged = tables.stage(record, Some(plan));

        let created = mapper::record_to_domain(staged.record.clone(), staged.images_or(&[]))?;
        tables.commit(staged);
        Ok(created)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()), err)]
    async fn list_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<Product>> {
        let wanted: HashSet<ProductId> = ids.iter().copied().collect();
        let tables = self.read("list_by_ids")?;
        let records = tables
            .products
            .values()
            .filter(|r| wanted.contains(&r.id))
            .cloned()
            .collect();
        Ok(mapper::records_to_domain(records, &tables.images)?)
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        let tables = self.read("find_by_id")?;
        let record = tables
            .products
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))?;
        Ok(mapper::record_to_domain(record, &tables.images)?)
    }

    #[instrument(skip(self), err)]
    async fn find_by_category(&self, category: Category) -> CatalogResult<Vec<Product>> {
        let tables = self.read("find_by_category")?;
        let records = tables
            .products
            .values()
            .filter(|r| r.active && r.category == category.as_str())
            .cloned()
            .collect();
        Ok(mapper::records_to_domain(records, &tables.images)?)
    }

    #[instrument(skip(self, product), err)]
    async fn update(&self, id: ProductId, product: Product) -> CatalogResult<Product> {
        self.read_modify_write(id, Mutation::Update(&product), |record, images| {
            Ok(mapper::record_to_domain(record, images)?)
        })
    }

    /// Never decodes the row, so products whose stored data no longer maps
    /// onto the domain can still be disabled.
    #[instrument(skip(self), err)]
    async fn disable(&self, id: ProductId) -> CatalogResult<()> {
        self.read_modify_write(id, Mutation::Disable, |_, _| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StepClock;
    use catalog_products::{Price, ProductImage};
    use rust_decimal::Decimal;

    fn store() -> InMemoryProductStore {
        InMemoryProductStore::with_clock(Arc::new(StepClock::new()))
    }

    fn burger(images: &[&str]) -> Product {
        Product::draft(
            "Burger",
            "Beef",
            Price::new(Decimal::new(1099, 2)).unwrap(),
            Category::Snack,
            images.iter().map(|u| ProductImage::new(*u)).collect(),
        )
    }

    #[tokio::test]
    async fn ids_come_from_a_sequence_starting_at_one() {
        let store = store();
        let a = store.create(burger(&[])).await.unwrap();
        let b = store.create(burger(&[])).await.unwrap();
        assert_eq!(a.id, Some(ProductId::new(1)));
        assert_eq!(b.id, Some(ProductId::new(2)));
    }

    #[tokio::test]
    async fn create_ignores_caller_identity_fields() {
        let store = store();
        let mut input = burger(&["a"]);
        input.id = Some(ProductId::new(77));
        input.active = false;
        input.updated_at = Some(chrono::Utc::now());

        let created = store.create(input).await.unwrap();
        assert_eq!(created.id, Some(ProductId::new(1)));
        assert!(created.active);
        assert!(created.created_at.is_some());
        assert_eq!(created.updated_at, None);
    }

    #[tokio::test]
    async fn create_with_absent_images_yields_empty_collection() {
        let store = store();
        let mut input = burger(&[]);
        input.images = None;
        let created = store.create(input).await.unwrap();
        assert_eq!(created.images, Some(vec![]));
    }

    #[tokio::test]
    async fn list_by_ids_skips_missing_ids() {
        let store = store();
        let a = store.create(burger(&["a"])).await.unwrap().id.unwrap();
        let b = store.create(burger(&["b"])).await.unwrap().id.unwrap();

        let found = store
            .list_by_ids(&[b, ProductId::new(999), a])
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id.unwrap()).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(found[0].image_urls(), vec!["a"]);
        assert_eq!(found[1].image_urls(), vec!["b"]);
    }

    #[tokio::test]
    async fn update_on_missing_id_leaves_tables_untouched() {
        let store = store();
        let existing = store.create(burger(&["a"])).await.unwrap();

        let err = store
            .update(ProductId::new(404), burger(&["x"]))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound(ProductId::new(404)));

        let after = store.find_by_id(existing.id.unwrap()).await.unwrap();
        assert_eq!(after, existing);
        let tables = store.tables.read().unwrap();
        assert_eq!(tables.products.len(), 1);
        assert_eq!(tables.images.len(), 1);
        assert_eq!(tables.last_image_id, 1);
    }

    #[tokio::test]
    async fn update_replaces_images_and_leaves_other_products_alone() {
        let store = store();
        let a = store.create(burger(&["a1", "a2"])).await.unwrap().id.unwrap();
        let b = store.create(burger(&["b1"])).await.unwrap().id.unwrap();

        let updated = store.update(a, burger(&["a3"])).await.unwrap();
        assert_eq!(updated.image_urls(), vec!["a3"]);

        let other = store.find_by_id(b).await.unwrap();
        assert_eq!(other.image_urls(), vec!["b1"]);
        assert_eq!(other.updated_at, None);
    }

    #[tokio::test]
    async fn disable_on_missing_id_is_not_found() {
        let store = store();
        let err = store.disable(ProductId::new(3)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn category_listing_ignores_inactive_and_other_categories() {
        let store = store();
        let keep = store.create(burger(&[])).await.unwrap().id.unwrap();
        let gone = store.create(burger(&[])).await.unwrap().id.unwrap();
        let mut drink = burger(&[]);
        drink.category = Category::Drink;
        store.create(drink).await.unwrap();

        store.disable(gone).await.unwrap();

        let snacks = store.find_by_category(Category::Snack).await.unwrap();
        let ids: Vec<_> = snacks.iter().map(|p| p.id.unwrap()).collect();
        assert_eq!(ids, vec![keep]);
        assert!(store.find_by_category(Category::Dessert).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_category_row_surfaces_as_data_integrity() {
        let store = store();
        let id = store.create(burger(&[])).await.unwrap().id.unwrap();
        store
            .tables
            .write()
            .unwrap()
            .products
            .get_mut(&id)
            .unwrap()
            .category = "LANCHE".into();

        let err = store.find_by_id(id).await.unwrap_err();
        assert!(matches!(err, CatalogError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn undecodable_row_can_still_be_disabled() {
        let store = store();
        let id = store.create(burger(&["a"])).await.unwrap().id.unwrap();
        store
            .tables
            .write()
            .unwrap()
            .products
            .get_mut(&id)
            .unwrap()
            .category = "LANCHE".into();

        store.disable(id).await.unwrap();

        let tables = store.tables.read().unwrap();
        let row = &tables.products[&id];
        assert!(!row.active);
        assert!(row.updated_at.is_some());
        assert_eq!(row.category, "LANCHE");
        assert_eq!(tables.images.len(), 1);
    }

    #[tokio::test]
    async fn update_rewrites_an_undecodable_category() {
        let store = store();
        let id = store.create(burger(&[])).await.unwrap().id.unwrap();
        store
            .tables
            .write()
            .unwrap()
            .products
            .get_mut(&id)
            .unwrap()
            .category = "LANCHE".into();

        let updated = store.update(id, burger(&["b"])).await.unwrap();
        assert_eq!(updated.category, Category::Snack);
        assert_eq!(updated.image_urls(), vec!["b"]);
    }

    #[tokio::test]
    async fn image_ids_keep_counting_across_replacements() {
        let store = store();
        let id = store.create(burger(&["a", "b"])).await.unwrap().id.unwrap();
        store.update(id, burger(&["c"])).await.unwrap();

        let tables = store.tables.read().unwrap();
        let ids: Vec<_> = tables.images.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(tables.last_image_id, 3);
    }
}
