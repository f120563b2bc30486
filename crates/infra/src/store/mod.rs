//! Persistence for the catalog and for shoppers' drafts and carts.
//!
//! Two implementations share the same traits:
//!
//! - [`InMemoryShopStore`]: tests and `BLOOMCART_DATABASE_URL=memory`.
//! - [`SqliteShopStore`]: `sqlx` over SQLite.
//!
//! ## Commit contract
//!
//! [`BasketStore::commit`] applies one transition's [`BasketEvent`]s atomically: either
//! every row change lands or none does. Session events are ignored here; edit sessions
//! are owned by [`crate::session::EditSessions`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use bloomcart_basket::{BasketEvent, BasketSnapshot};
use bloomcart_catalog::{BouquetManifest, LineItem, NewProduct, Product};
use bloomcart_core::{ProductId, ShopperId};

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryShopStore;
pub use sqlite::SqliteShopStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A product with this name already exists.
    #[error("product name already taken: {0}")]
    NameCollision(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A stored value does not fit the domain type (or the other way round).
    #[error("invalid stored value: {0}")]
    Invalid(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Backend(value.to_string())
    }
}

/// What a commit produced beyond the events themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Identifier assigned to a packed bouquet, if the commit packed one.
    pub created: Option<ProductId>,
}

/// Product lookup and creation.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup_by_id(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn lookup_by_name(&self, name: &str) -> StoreResult<Option<Product>>;

    /// Fails with [`StoreError::NameCollision`] when the name is taken.
    async fn create(&self, product: NewProduct) -> StoreResult<Product>;

    async fn update(&self, id: ProductId, price: u64, description: &str) -> StoreResult<Product>;

    /// All products, ascending id.
    async fn list(&self) -> StoreResult<Vec<Product>>;

    /// Structured manifest of a composed bouquet; `None` for bouquets packed before
    /// manifests were stored separately.
    async fn manifest(&self, id: ProductId) -> StoreResult<Option<BouquetManifest>>;
}

/// Draft and cart rows per shopper.
#[async_trait]
pub trait BasketStore: Send + Sync {
    async fn load_basket(&self, shopper: ShopperId) -> StoreResult<BasketSnapshot>;

    /// Draft lines joined with their products, ascending product id. Lines whose product
    /// no longer exists are skipped.
    async fn draft_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>>;

    /// Cart lines joined with their products, ascending product id. Lines whose product
    /// no longer exists are skipped.
    async fn cart_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>>;

    async fn commit(&self, shopper: ShopperId, events: &[BasketEvent])
    -> StoreResult<CommitReceipt>;

    /// Deletes composed bouquets no draft or cart references (and not in `protected`),
    /// with their manifests. Returns the deleted ids, ascending.
    async fn purge_orphaned_bouquets(&self, protected: &[ProductId])
    -> StoreResult<Vec<ProductId>>;
}

/// Everything the engine needs from storage.
pub trait ShopStore: Catalog + BasketStore {}

impl<T> ShopStore for T where T: Catalog + BasketStore + ?Sized {}

#[async_trait]
impl<S> Catalog for Arc<S>
where
    S: Catalog + ?Sized,
{
    async fn lookup_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).lookup_by_id(id).await
    }

    async fn lookup_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        (**self).lookup_by_name(name).await
    }

    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        (**self).create(product).await
    }

    async fn update(&self, id: ProductId, price: u64, description: &str) -> StoreResult<Product> {
        (**self).update(id, price, description).await
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        (**self).list().await
    }

    async fn manifest(&self, id: ProductId) -> StoreResult<Option<BouquetManifest>> {
        (**self).manifest(id).await
    }
}

#[async_trait]
impl<S> BasketStore for Arc<S>
where
    S: BasketStore + ?Sized,
{
    async fn load_basket(&self, shopper: ShopperId) -> StoreResult<BasketSnapshot> {
        (**self).load_basket(shopper).await
    }

    async fn draft_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        (**self).draft_lines(shopper).await
    }

    async fn cart_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        (**self).cart_lines(shopper).await
    }

    async fn commit(
        &self,
        shopper: ShopperId,
        events: &[BasketEvent],
    ) -> StoreResult<CommitReceipt> {
        (**self).commit(shopper, events).await
    }

    async fn purge_orphaned_bouquets(
        &self,
        protected: &[ProductId],
    ) -> StoreResult<Vec<ProductId>> {
        (**self).purge_orphaned_bouquets(protected).await
    }
}
