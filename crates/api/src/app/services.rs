//! Service wiring: picks the product store backend from configuration.

use std::sync::Arc;

use tracing::info;

use catalog_infra::{InMemoryProductStore, PostgresProductStore, StorageConfig};
use catalog_products::{CatalogResult, ProductService, ProductStore};

/// Store handle shared by every request.
pub type SharedStore = Arc<dyn ProductStore>;

/// Application services shared with handlers through an `Extension`.
pub struct AppServices {
    pub products: ProductService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            products: ProductService::new(store),
        }
    }

    /// Services over a fresh in-memory store (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProductStore::new()))
    }
}

/// Build services for the configured backend.
///
/// The Postgres backend connects eagerly and creates its tables when missing.
pub async fn build_services(storage: &StorageConfig) -> CatalogResult<AppServices> {
    match storage {
        StorageConfig::InMemory => {
            info!("using in-memory product store");
            Ok(AppServices::in_memory())
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresProductStore::connect(database_url, *max_connections).await?;
            store.ensure_schema().await?;
            info!(max_connections, "using postgres product store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
