use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use bloomcart_basket::{BasketEvent, BasketSnapshot};
use bloomcart_catalog::{BouquetManifest, LineItem, NewProduct, Product, ProductKind};
use bloomcart_core::{ProductId, ShopperId};

use super::{BasketStore, Catalog, CommitReceipt, StoreError, StoreResult};

#[derive(Debug, Default, Clone)]
struct State {
    products: BTreeMap<ProductId, Product>,
    manifests: HashMap<ProductId, BouquetManifest>,
    baskets: HashMap<ShopperId, BasketSnapshot>,
    last_id: i64,
}

impl State {
    fn insert_product(&mut self, product: NewProduct) -> StoreResult<Product> {
        product
            .validate()
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        if self.products.values().any(|p| p.name == product.name) {
            return Err(StoreError::NameCollision(product.name));
        }
        self.last_id += 1;
        let product = product.into_product(ProductId::new(self.last_id));
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn update_product(&mut self, id: ProductId, price: u64, description: &str) -> StoreResult<Product> {
        let product = self.products.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        product.price = price;
        product.description = description.to_string();
        Ok(product.clone())
    }

    fn joined(&self, lines: &BTreeMap<ProductId, u32>) -> Vec<LineItem> {
        lines
            .iter()
            .filter_map(|(id, qty)| self.products.get(id).map(|p| LineItem::from_product(p, *qty)))
            .collect()
    }

    fn apply(&mut self, shopper: ShopperId, event: &BasketEvent) -> StoreResult<Option<ProductId>> {
        let created = match event {
            BasketEvent::BouquetPacked {
                bouquet, manifest, ..
            } => {
                let product = self.insert_product(bouquet.clone())?;
                self.manifests.insert(product.id, manifest.clone());
                Some(product.id)
            }
            BasketEvent::BouquetRevised {
                product_id,
                price,
                description,
                manifest,
            } => {
                self.update_product(*product_id, *price, description)?;
                self.manifests.insert(*product_id, manifest.clone());
                None
            }
            _ => None,
        };

        let basket = self.baskets.entry(shopper).or_default();
        basket.apply(event);
        if let Some(id) = created {
            basket.record_packed(id);
        }
        Ok(created)
    }
}

/// In-memory shop store.
///
/// Intended for tests/dev. Commits run against a copy of the state that replaces the
/// original only when every event applied cleanly.
#[derive(Debug, Default)]
pub struct InMemoryShopStore {
    state: RwLock<State>,
}

impl InMemoryShopStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> StoreResult<T> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&mut state)
    }
}

#[async_trait]
impl Catalog for InMemoryShopStore {
    async fn lookup_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.read(|s| s.products.get(&id).cloned())
    }

    async fn lookup_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        self.read(|s| s.products.values().find(|p| p.name == name).cloned())
    }

    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        self.write(|s| s.insert_product(product))
    }

    async fn update(&self, id: ProductId, price: u64, description: &str) -> StoreResult<Product> {
        self.write(|s| s.update_product(id, price, description))
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        self.read(|s| s.products.values().cloned().collect())
    }

    async fn manifest(&self, id: ProductId) -> StoreResult<Option<BouquetManifest>> {
        self.read(|s| s.manifests.get(&id).cloned())
    }
}

#[async_trait]
impl BasketStore for InMemoryShopStore {
    async fn load_basket(&self, shopper: ShopperId) -> StoreResult<BasketSnapshot> {
        self.read(|s| s.baskets.get(&shopper).cloned().unwrap_or_default())
    }

    async fn draft_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        self.read(|s| {
            s.baskets
                .get(&shopper)
                .map(|b| s.joined(&b.draft))
                .unwrap_or_default()
        })
    }

    async fn cart_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        self.read(|s| {
            s.baskets
                .get(&shopper)
                .map(|b| s.joined(&b.cart))
                .unwrap_or_default()
        })
    }

    async fn commit(
        &self,
        shopper: ShopperId,
        events: &[BasketEvent],
    ) -> StoreResult<CommitReceipt> {
        self.write(|state| {
            let mut next = state.clone();
            let mut receipt = CommitReceipt::default();
            for event in events.iter().filter(|e| !e.is_session_event()) {
                if let Some(id) = next.apply(shopper, event)? {
                    receipt.created = Some(id);
                }
            }
            *state = next;
            Ok(receipt)
        })
    }

    async fn purge_orphaned_bouquets(
        &self,
        protected: &[ProductId],
    ) -> StoreResult<Vec<ProductId>> {
        self.write(|state| {
            let orphans: Vec<ProductId> = state
                .products
                .values()
                .filter(|p| p.kind == ProductKind::ComposedBouquet)
                .map(|p| p.id)
                .filter(|id| !protected.contains(id))
                .filter(|id| {
                    !state
                        .baskets
                        .values()
                        .any(|b| b.draft.contains_key(id) || b.cart.contains_key(id))
                })
                .collect();

            for id in &orphans {
                state.products.remove(id);
                state.manifests.remove(id);
            }
            Ok(orphans)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomcart_catalog::{Component, Packaging};

    fn rose() -> NewProduct {
        NewProduct::new("Розы", 220, ProductKind::SingleFlower)
    }

    fn packed(name: &str) -> BasketEvent {
        BasketEvent::BouquetPacked {
            bouquet: NewProduct::new(name, 675, ProductKind::ComposedBouquet)
                .with_description("Состав: Розы (3). В упаковке."),
            manifest: BouquetManifest {
                components: vec![Component {
                    product_id: ProductId::new(1),
                    quantity: 3,
                }],
                packaging: Packaging::Wrapped,
            },
            replaces: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_rejects_duplicate_names() {
        let store = InMemoryShopStore::new();
        let first = store.create(rose()).await.unwrap();
        let second = store
            .create(NewProduct::new("Тюльпаны", 180, ProductKind::SingleFlower))
            .await
            .unwrap();
        assert_eq!(first.id, ProductId::new(1));
        assert_eq!(second.id, ProductId::new(2));

        let err = store.create(rose()).await.unwrap_err();
        assert_eq!(err, StoreError::NameCollision("Розы".to_string()));
    }

    #[tokio::test]
    async fn failed_commit_changes_nothing() {
        let store = InMemoryShopStore::new();
        store.create(rose()).await.unwrap();
        store
            .create(NewProduct::new("Авторский букет №11111", 1, ProductKind::ComposedBouquet))
            .await
            .unwrap();
        let shopper = ShopperId::new(7);

        let events = vec![
            BasketEvent::DraftLineSet {
                product_id: ProductId::new(1),
                quantity: 3,
            },
            packed("Авторский букет №11111"),
        ];
        let err = store.commit(shopper, &events).await.unwrap_err();
        assert!(matches!(err, StoreError::NameCollision(_)));

        assert!(store.load_basket(shopper).await.unwrap().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pack_commit_reports_created_id_and_adds_cart_line() {
        let store = InMemoryShopStore::new();
        store.create(rose()).await.unwrap();
        let shopper = ShopperId::new(7);

        let receipt = store
            .commit(shopper, &[packed("Авторский букет №22222")])
            .await
            .unwrap();
        let id = receipt.created.unwrap();

        let basket = store.load_basket(shopper).await.unwrap();
        assert_eq!(basket.cart.get(&id), Some(&1));
        assert!(store.manifest(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lines_skip_vanished_products() {
        let store = InMemoryShopStore::new();
        let rose = store.create(rose()).await.unwrap();
        let shopper = ShopperId::new(7);
        store
            .commit(
                shopper,
                &[
                    BasketEvent::DraftLineSet {
                        product_id: rose.id,
                        quantity: 2,
                    },
                    BasketEvent::DraftLineSet {
                        product_id: ProductId::new(99),
                        quantity: 1,
                    },
                ],
            )
            .await
            .unwrap();

        let lines = store.draft_lines(shopper).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, rose.id);
    }

    #[tokio::test]
    async fn purge_keeps_referenced_and_protected_bouquets() {
        let store = InMemoryShopStore::new();
        store.create(rose()).await.unwrap();
        let in_cart = store
            .commit(ShopperId::new(1), &[packed("Авторский букет №10001")])
            .await
            .unwrap()
            .created
            .unwrap();
        let orphan = store
            .create(NewProduct::new("Авторский букет №10002", 1, ProductKind::ComposedBouquet))
            .await
            .unwrap()
            .id;
        let protected = store
            .create(NewProduct::new("Авторский букет №10003", 1, ProductKind::ComposedBouquet))
            .await
            .unwrap()
            .id;

        let purged = store.purge_orphaned_bouquets(&[protected]).await.unwrap();
        assert_eq!(purged, vec![orphan]);
        assert!(store.lookup_by_id(in_cart).await.unwrap().is_some());
        assert!(store.lookup_by_id(protected).await.unwrap().is_some());
        assert!(store.lookup_by_id(ProductId::new(1)).await.unwrap().is_some());
    }
}
