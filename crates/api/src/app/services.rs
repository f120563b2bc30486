use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use bloomcart_catalog::seed::initial_catalog;
use bloomcart_infra::{BasketEngine, InMemoryShopStore, ShopStore, SqliteShopStore, seed_catalog};

use crate::config::{AppConfig, StoreBackend};

pub type SharedStore = Arc<dyn ShopStore>;

/// Everything the handlers need, shared behind an `Extension`.
pub struct AppServices {
    engine: BasketEngine<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, packaging_fee: u64) -> Self {
        Self {
            engine: BasketEngine::new(store).with_packaging_fee(packaging_fee),
        }
    }

    pub fn engine(&self) -> &BasketEngine<SharedStore> {
        &self.engine
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.database {
        StoreBackend::Memory => Arc::new(InMemoryShopStore::new()),
        StoreBackend::Sqlite(url) => Arc::new(
            SqliteShopStore::connect(url)
                .await
                .with_context(|| format!("failed to open database {url}"))?,
        ),
    };
    info!(backend = config.database.name(), "store ready");

    if config.seed_catalog {
        seed_catalog(&store, initial_catalog())
            .await
            .context("failed to seed the catalog")?;
    }

    Ok(AppServices::new(store, config.packaging_fee))
}
