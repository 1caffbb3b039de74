//! Postgres-backed product store.
//!
//! Two tables: `product` and `product_image`. Image rows point back at their
//! product through `product_id` without a foreign key; readers attach them by
//! equality. Ids come from `BIGSERIAL` sequences.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | CatalogError | Scenario |
//! |------------|----------------------|--------------|----------|
//! | Database (unique violation) | `23505` | `Storage` | Sequence collision (should not occur) |
//! | Database (check constraint violation) | `23514` | `Storage` | Negative price slipped past validation |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | RowNotFound | N/A | `Storage` | Unexpected row not found |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! A missing product is detected explicitly (`fetch_optional`) and reported as
//! `NotFound`, never through `RowNotFound`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use catalog_core::{Clock, ImageId, ProductId, SystemClock};
use catalog_products::store::prepare_create;
use catalog_products::{
    mapper, CatalogError, CatalogResult, Category, ImageReplacement, Mutation, Product,
    ProductImageRecord, ProductRecord, ProductStore,
};

/// DDL applied by [`PostgresProductStore::ensure_schema`]. Idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS product (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price       NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        category    TEXT NOT NULL,
        active      BOOLEAN NOT NULL DEFAULT TRUE,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS product_category_active_idx
        ON product (category, active)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_image (
        id          BIGSERIAL PRIMARY KEY,
        product_id  BIGINT NOT NULL,
        url         TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS product_image_product_id_idx
        ON product_image (product_id)
    "#,
];

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, active, created_at, updated_at";
const IMAGE_COLUMNS: &str = "id, product_id, url, created_at, updated_at";

/// Postgres-backed product store.
///
/// Every write runs inside one transaction; `update` and `disable` lock the
/// product row (`SELECT ... FOR UPDATE`) before modifying it so concurrent
/// read-modify-writes on the same id serialize.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl PostgresProductStore {
    /// Create a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool: Arc::new(pool),
            clock,
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> CatalogResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> CatalogResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> CatalogResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Lock the row, apply the mutation, write it back and replace images.
    ///
    /// `finish` sees the saved row and its new image rows (empty when the
    /// mutation leaves images alone). Its error rolls the transaction back.
    async fn read_modify_write<T>(
        &self,
        id: ProductId,
        mutation: Mutation<'_>,
        finish: impl FnOnce(ProductRecord, &[ProductImageRecord]) -> CatalogResult<T> + Send,
    ) -> CatalogResult<T> {
        let now = self.clock.now();
        let mut tx = self.begin().await?;

        let current = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        let Some(current) = current else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(CatalogError::NotFound(id));
        };
        let current = ProductRow::from_row(&current)
            .map_err(|e| row_decode_error("product", e))?
            .into_record();

        let next = mutation.apply(current, now);
        let row = sqlx::query(&format!(
            r#"
            UPDATE product
            SET name = $2, description = $3, price = $4, category = $5,
                active = $6, updated_at = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(&next.name)
        .bind(&next.description)
        .bind(next.price)
        .bind(&next.category)
        .bind(next.active)
        .bind(next.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        let saved = ProductRow::from_row(&row)
            .map_err(|e| row_decode_error("product", e))?
            .into_record();

        let images = match mutation.images(id, now) {
            Some(plan) => replace_images(&mut tx, plan).await?,
            None => Vec::new(),
        };

        let out = match finish(saved, &images) {
            Ok(out) => out,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e);
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(out)
    }
}

impl core::fmt::Debug for PostgresProductStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresProductStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(
        skip(self, product),
        fields(
            category = %product.category,
            product_id = tracing::field::Empty,
            image_count = tracing::field::Empty
        ),
        err
    )]
    async fn create(&self, product: Product) -> CatalogResult<Product> {
        let span = Span::current();
        let row = prepare_create(&product, self.clock.now());
        let mut tx = self.begin().await?;

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO product (name, description, price, category, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.price)
        .bind(&row.category)
        .bind(row.active)
        .bind(row.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        let saved = ProductRow::from_row(&inserted)
            .map_err(|e| row_decode_error("product", e))?
            .into_record();

        let plan = ImageReplacement::for_create(saved.id, product.images.as_deref(), row.created_at);
        let images = replace_images(&mut tx, plan).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        span.record("product_id", saved.id.get());
        span.record("image_count", images.len());
        Ok(mapper::record_to_domain(saved, &images)?)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len(), found = tracing::field::Empty), err)]
    async fn list_by_ids(&self, ids: &[ProductId]) -> CatalogResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ANY($1) ORDER BY id ASC"
        ))
        .bind(raw)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_ids", e))?;

        let products = self.assemble(rows).await?;
        Span::current().record("found", products.len());
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = id.get()), err)]
    async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?
        .ok_or(CatalogError::NotFound(id))?;

        let record = ProductRow::from_row(&row)
            .map_err(|e| row_decode_error("product", e))?
            .into_record();
        let images = load_images(&*self.pool, &[id]).await?;
        Ok(mapper::record_to_domain(record, &images)?)
    }

    #[instrument(skip(self), fields(found = tracing::field::Empty), err)]
    async fn find_by_category(&self, category: Category) -> CatalogResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM product
            WHERE category = $1 AND active = TRUE
            ORDER BY id ASC
            "#
        ))
        .bind(category.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_category", e))?;

        let products = self.assemble(rows).await?;
        Span::current().record("found", products.len());
        Ok(products)
    }

    #[instrument(skip(self, product), fields(product_id = id.get()), err)]
    async fn update(&self, id: ProductId, product: Product) -> CatalogResult<Product> {
        self.read_modify_write(id, Mutation::Update(&product), |saved, images| {
            Ok(mapper::record_to_domain(saved, images)?)
        })
        .await
    }

    /// Never decodes the row, so products whose stored data no longer maps
    /// onto the domain can still be disabled.
    #[instrument(skip(self), fields(product_id = id.get()), err)]
    async fn disable(&self, id: ProductId) -> CatalogResult<()> {
        self.read_modify_write(id, Mutation::Disable, |_, _| Ok(()))
            .await
    }
}

impl PostgresProductStore {
    /// Decode product rows and attach their images with one extra query.
    async fn assemble(&self, rows: Vec<PgRow>) -> CatalogResult<Vec<Product>> {
        let records = rows
            .iter()
            .map(|row| {
                ProductRow::from_row(row)
                    .map(ProductRow::into_record)
                    .map_err(|e| row_decode_error("product", e))
            })
            .collect::<CatalogResult<Vec<_>>>()?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = records.iter().map(|r| r.id).collect();
        let images = load_images(&*self.pool, &ids).await?;
        Ok(mapper::records_to_domain(records, &images)?)
    }
}

/// Image rows of the given products, in insertion order.
async fn load_images<'e, E>(executor: E, ids: &[ProductId]) -> CatalogResult<Vec<ProductImageRecord>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
    let rows = sqlx::query(&format!(
        "SELECT {IMAGE_COLUMNS} FROM product_image WHERE product_id = ANY($1) ORDER BY id ASC"
    ))
    .bind(raw)
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("load_images", e))?;

    rows.iter()
        .map(|row| {
            ImageRow::from_row(row)
                .map(ImageRow::into_record)
                .map_err(|e| row_decode_error("product_image", e))
        })
        .collect()
}

/// Delete every image row of the product, then insert the plan's rows.
///
/// Returns the product's image rows as they now stand.
async fn replace_images(
    tx: &mut Transaction<'_, Postgres>,
    plan: ImageReplacement,
) -> CatalogResult<Vec<ProductImageRecord>> {
    sqlx::query("DELETE FROM product_image WHERE product_id = $1")
        .bind(plan.product_id.get())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("delete_images", e))?;

    let mut inserted = Vec::with_capacity(plan.rows.len());
    for image in plan.rows {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO product_image (product_id, url, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.product_id.get())
        .bind(&image.url)
        .bind(image.created_at)
        .bind(image.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_image", e))?;

        inserted.push(
            ImageRow::from_row(&row)
                .map_err(|e| row_decode_error("product_image", e))?
                .into_record(),
        );
    }
    Ok(inserted)
}

/// Map SQLx errors to CatalogError.
///
/// Every engine failure is a storage fault; the SQLSTATE code is kept in the
/// message so constraint violations stay recognizable in logs.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CatalogError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => CatalogError::storage(format!(
                "database error in {} ({}): {}",
                operation,
                code,
                db_err.message()
            )),
            None => CatalogError::storage(format!(
                "database error in {}: {}",
                operation,
                db_err.message()
            )),
        },
        sqlx::Error::PoolClosed => {
            CatalogError::storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            CatalogError::storage(format!("unexpected row not found in {}", operation))
        }
        _ => CatalogError::storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn row_decode_error(table: &str, err: sqlx::Error) -> CatalogError {
    CatalogError::DataIntegrity(format!("failed to decode {table} row: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            category: row.try_get("category")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ProductRow {
    fn into_record(self) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug)]
struct ImageRow {
    id: i64,
    product_id: i64,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for ImageRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ImageRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            url: row.try_get("url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ImageRow {
    fn into_record(self) -> ProductImageRecord {
        ProductImageRecord {
            id: ImageId::new(self.id),
            product_id: ProductId::new(self.product_id),
            url: self.url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
