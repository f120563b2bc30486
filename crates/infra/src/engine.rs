//! Basket engine: application-level orchestration of draft, cart and builder transitions.
//!
//! ## Transition Flow
//!
//! ```text
//! Operation
//!   ↓
//! 1. Acquire the shopper lock (one transition per shopper at a time)
//!   ↓
//! 2. Load the basket: draft + cart rows, current edit session
//!   ↓
//! 3. Gather catalog inputs (prices, manifests, a bouquet name)
//!   ↓
//! 4. Basket::handle (pure decision, produces events)
//!   ↓
//! 5. Commit row changes in one store transaction
//!   ↓
//! 6. Apply session changes
//! ```
//!
//! Nothing is applied to the edit session unless the commit succeeded, so a failed
//! transition leaves the shopper exactly where they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use bloomcart_basket::{AdjustMode, Basket, BasketCommand, BasketEvent, EditSession};
use bloomcart_catalog::{
    BouquetNamer, Component, Composition, DEFAULT_PACKAGING_FEE, LineItem, Packaging, Product,
    ProductKind, RandomBouquetNamer, TextManifest, bouquet_name, lines_total, retry_suffix,
};
use bloomcart_core::{DomainError, ProductId, ShopperId};

use crate::locks::ShopperLocks;
use crate::session::EditSessions;
use crate::store::{CommitReceipt, ShopStore, StoreError};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("the bouquet draft is empty")]
    EmptyDraft,

    #[error("the cart is empty")]
    EmptyCart,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is not a composed bouquet")]
    NotComposedBouquet(ProductId),

    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error("product {0} is not a single flower")]
    NotAFlower(ProductId),

    /// Both name attempts collided.
    #[error("could not pack the bouquet: {0}")]
    PackFailed(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                EngineError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => EngineError::Invariant(msg),
            DomainError::ProductNotFound(id) => EngineError::ProductNotFound(id),
            DomainError::NotComposedBouquet(id) => EngineError::NotComposedBouquet(id),
            DomainError::NotInCart(id) => EngineError::NotInCart(id),
            DomainError::NotAFlower(id) => EngineError::NotAFlower(id),
            DomainError::EmptyDraft => EngineError::EmptyDraft,
            DomainError::EmptyCart => EngineError::EmptyCart,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => EngineError::ProductNotFound(id),
            other => EngineError::Store(other),
        }
    }
}

/// Demo checkout result. No payment is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub lines: Vec<LineItem>,
    pub total: u64,
    pub placed_at: DateTime<Utc>,
}

/// Result of re-opening a composed bouquet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOpened {
    pub product_id: ProductId,
    /// The rebuilt draft.
    pub lines: Vec<LineItem>,
    /// Manifest entries that no longer resolve to a product.
    pub skipped: usize,
    /// The bouquet had no structured manifest and its description did not parse.
    pub manifest_unreadable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The edited bouquet was rewritten in place.
    Revised {
        product_id: ProductId,
        price: u64,
        description: String,
    },
    /// The draft was empty, so the edited bouquet left the cart.
    RemovedFromCart { product_id: ProductId },
    /// Nothing was being edited (or nothing was left to change).
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackedBouquet {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub packaging: Packaging,
    pub base_total: u64,
    pub fee: u64,
    pub total: u64,
}

/// What the builder screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderSummary {
    pub lines: Vec<LineItem>,
    pub draft_total: u64,
    pub cart_total: u64,
    pub grand_total: u64,
    pub editing: Option<EditSession>,
}

#[derive(Debug, Default)]
struct ResolvedManifest {
    components: Vec<Component>,
    skipped: usize,
    unreadable: bool,
}

/// Runs basket transitions against a [`ShopStore`].
pub struct BasketEngine<S> {
    store: S,
    namer: Arc<dyn BouquetNamer>,
    packaging_fee: u64,
    sessions: EditSessions,
    locks: ShopperLocks,
}

impl<S> BasketEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            namer: Arc::new(RandomBouquetNamer),
            packaging_fee: DEFAULT_PACKAGING_FEE,
            sessions: EditSessions::new(),
            locks: ShopperLocks::new(),
        }
    }

    pub fn with_namer(mut self, namer: Arc<dyn BouquetNamer>) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_packaging_fee(mut self, fee: u64) -> Self {
        self.packaging_fee = fee;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn packaging_fee(&self) -> u64 {
        self.packaging_fee
    }

    pub fn editing(&self, shopper: ShopperId) -> Option<EditSession> {
        self.sessions.get(shopper)
    }
}

impl<S> BasketEngine<S>
where
    S: ShopStore,
{
    async fn basket(&self, shopper: ShopperId) -> EngineResult<Basket> {
        let snapshot = self.store.load_basket(shopper).await?;
        Ok(Basket::new(shopper, snapshot, self.sessions.get(shopper)))
    }

    async fn commit(
        &self,
        shopper: ShopperId,
        events: &[BasketEvent],
    ) -> EngineResult<CommitReceipt> {
        if events.is_empty() {
            return Ok(CommitReceipt::default());
        }
        let receipt = self.store.commit(shopper, events).await?;
        self.sessions.apply(shopper, events);

        for event in events {
            debug!(shopper_id = %shopper, event_type = event.event_type(), "basket event committed");
        }
        Ok(receipt)
    }

    async fn require_product(&self, id: ProductId) -> EngineResult<Product> {
        self.store
            .lookup_by_id(id)
            .await?
            .ok_or(EngineError::ProductNotFound(id))
    }

    /// Change a draft line; returns the resulting quantity (0 means no line).
    ///
    /// Only single flowers can be added.
    #[instrument(skip(self), fields(shopper_id = %shopper, product_id = %product_id), err)]
    pub async fn adjust_draft(
        &self,
        shopper: ShopperId,
        product_id: ProductId,
        mode: AdjustMode,
        delta: u32,
    ) -> EngineResult<u32> {
        let _guard = self.locks.acquire(shopper).await;
        if mode == AdjustMode::Add {
            let product = self.require_product(product_id).await?;
            if product.kind != ProductKind::SingleFlower {
                return Err(EngineError::NotAFlower(product_id));
            }
        }

        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::AdjustDraft {
            product_id,
            mode,
            delta,
        })?;
        self.commit(shopper, &events).await?;

        Ok(basket
            .preview(&events)
            .draft
            .get(&product_id)
            .copied()
            .unwrap_or(0))
    }

    /// Empties the draft. An open edit session stays open, so a later pack still
    /// supersedes the edited bouquet and a save drops its cart line.
    pub async fn reset_draft(&self, shopper: ShopperId) -> EngineResult<()> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::ResetDraft)?;
        self.commit(shopper, &events).await?;
        Ok(())
    }

    pub async fn draft_lines(&self, shopper: ShopperId) -> EngineResult<Vec<LineItem>> {
        Ok(self.store.draft_lines(shopper).await?)
    }

    pub async fn draft_total(&self, shopper: ShopperId) -> EngineResult<u64> {
        Ok(lines_total(&self.draft_lines(shopper).await?))
    }

    /// Returns the resulting cart quantity.
    #[instrument(skip(self), fields(shopper_id = %shopper, product_id = %product_id), err)]
    pub async fn add_to_cart(
        &self,
        shopper: ShopperId,
        product_id: ProductId,
        quantity: u32,
    ) -> EngineResult<u32> {
        let _guard = self.locks.acquire(shopper).await;
        self.require_product(product_id).await?;

        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::AddToCart {
            product_id,
            quantity,
        })?;
        self.commit(shopper, &events).await?;
        Ok(basket.preview(&events).cart.get(&product_id).copied().unwrap_or(0))
    }

    /// Takes one unit off a cart line; returns the resulting quantity (0 if removed or
    /// absent).
    pub async fn decrement_cart(
        &self,
        shopper: ShopperId,
        product_id: ProductId,
    ) -> EngineResult<u32> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::DecrementCart { product_id })?;
        self.commit(shopper, &events).await?;
        Ok(basket.preview(&events).cart.get(&product_id).copied().unwrap_or(0))
    }

    pub async fn remove_from_cart(
        &self,
        shopper: ShopperId,
        product_id: ProductId,
    ) -> EngineResult<()> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::RemoveFromCart { product_id })?;
        self.commit(shopper, &events).await?;
        Ok(())
    }

    pub async fn clear_cart(&self, shopper: ShopperId) -> EngineResult<()> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::ClearCart)?;
        self.commit(shopper, &events).await?;
        Ok(())
    }

    pub async fn cart_lines(&self, shopper: ShopperId) -> EngineResult<Vec<LineItem>> {
        Ok(self.store.cart_lines(shopper).await?)
    }

    pub async fn cart_total(&self, shopper: ShopperId) -> EngineResult<u64> {
        Ok(lines_total(&self.cart_lines(shopper).await?))
    }

    #[instrument(skip(self), fields(shopper_id = %shopper), err)]
    pub async fn checkout(&self, shopper: ShopperId) -> EngineResult<CheckoutReceipt> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::Checkout)?;

        let lines = self.store.cart_lines(shopper).await?;
        let total = lines_total(&lines);
        self.commit(shopper, &events).await?;

        let receipt = CheckoutReceipt {
            order_id: Uuid::now_v7(),
            lines,
            total,
            placed_at: Utc::now(),
        };
        info!(shopper_id = %shopper, order_id = %receipt.order_id, total, "checkout completed");
        Ok(receipt)
    }

    /// Start a fresh bouquet: empty draft, no edit session.
    pub async fn begin_new(&self, shopper: ShopperId) -> EngineResult<()> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::BeginNew)?;
        self.commit(shopper, &events).await?;
        Ok(())
    }

    /// Re-open a composed bouquet: the draft is rebuilt from its manifest and the
    /// bouquet's cart line stays where it is.
    #[instrument(skip(self), fields(shopper_id = %shopper, product_id = %product_id), err)]
    pub async fn begin_edit(
        &self,
        shopper: ShopperId,
        product_id: ProductId,
    ) -> EngineResult<EditOpened> {
        let _guard = self.locks.acquire(shopper).await;
        let bouquet = self.require_product(product_id).await?;
        if !bouquet.is_composed_bouquet() {
            return Err(EngineError::NotComposedBouquet(product_id));
        }
        let basket = self.basket(shopper).await?;
        if basket.cart_quantity(product_id) == 0 {
            return Err(EngineError::NotInCart(product_id));
        }

        let resolved = self.resolve_manifest(&bouquet).await?;
        if resolved.skipped > 0 {
            warn!(skipped = resolved.skipped, "manifest entries skipped");
        }

        let events = basket.handle(&BasketCommand::BeginEdit {
            product_id,
            components: resolved.components,
            started_at: Utc::now(),
        })?;
        self.commit(shopper, &events).await?;

        Ok(EditOpened {
            product_id,
            lines: self.store.draft_lines(shopper).await?,
            skipped: resolved.skipped,
            manifest_unreadable: resolved.unreadable,
        })
    }

    /// Prefers the structured manifest; bouquets without one fall back to the text
    /// manifest in their description, resolved by product name. Entries that are not
    /// (or no longer) single flowers in the catalog are skipped.
    async fn resolve_manifest(&self, bouquet: &Product) -> EngineResult<ResolvedManifest> {
        let mut resolved = ResolvedManifest::default();

        if let Some(manifest) = self.store.manifest(bouquet.id).await? {
            for component in manifest.components {
                let product = self.store.lookup_by_id(component.product_id).await?;
                if product.is_some_and(|p| p.kind == ProductKind::SingleFlower) {
                    resolved.components.push(component);
                } else {
                    resolved.skipped += 1;
                }
            }
            return Ok(resolved);
        }

        match TextManifest::parse(&bouquet.description) {
            Ok(text) => {
                for entry in text.entries {
                    match self.store.lookup_by_name(&entry.name).await? {
                        Some(product) if product.kind == ProductKind::SingleFlower => {
                            resolved.components.push(Component {
                                product_id: product.id,
                                quantity: entry.quantity,
                            })
                        }
                        _ => resolved.skipped += 1,
                    }
                }
            }
            Err(err) => {
                warn!(product_id = %bouquet.id, error = %err, "bouquet manifest unreadable, opening an empty draft");
                resolved.unreadable = true;
            }
        }
        Ok(resolved)
    }

    /// Packaging a revised bouquet keeps. Legacy bouquets that never recorded one are
    /// treated as unwrapped.
    async fn edited_packaging(&self, product_id: ProductId) -> EngineResult<Packaging> {
        if let Some(manifest) = self.store.manifest(product_id).await? {
            return Ok(manifest.packaging);
        }
        let packaging = self
            .store
            .lookup_by_id(product_id)
            .await?
            .and_then(|p| TextManifest::parse(&p.description).ok())
            .and_then(|m| m.packaging);
        Ok(packaging.unwrap_or(Packaging::Unwrapped))
    }

    /// Leave the builder without touching the cart.
    pub async fn discard_and_exit(&self, shopper: ShopperId) -> EngineResult<()> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        let events = basket.handle(&BasketCommand::DiscardAndExit)?;
        self.commit(shopper, &events).await?;
        Ok(())
    }

    /// Leave the builder, folding the draft back into the bouquet being edited.
    #[instrument(skip(self), fields(shopper_id = %shopper), err)]
    pub async fn save_and_exit(&self, shopper: ShopperId) -> EngineResult<SaveOutcome> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;

        let composition = match basket.editing() {
            Some(session) => {
                let lines = self.store.draft_lines(shopper).await?;
                if lines.is_empty() {
                    None
                } else {
                    let packaging = self.edited_packaging(session.product_id).await?;
                    Some(Composition::new(lines, packaging, self.packaging_fee)?)
                }
            }
            None => None,
        };

        let events = basket.handle(&BasketCommand::SaveAndExit { composition })?;
        self.commit(shopper, &events).await?;

        let outcome = events
            .iter()
            .find_map(|event| match event {
                BasketEvent::BouquetRevised {
                    product_id,
                    price,
                    description,
                    ..
                } => Some(SaveOutcome::Revised {
                    product_id: *product_id,
                    price: *price,
                    description: description.clone(),
                }),
                BasketEvent::CartLineSet {
                    product_id,
                    quantity: 0,
                } => Some(SaveOutcome::RemovedFromCart {
                    product_id: *product_id,
                }),
                _ => None,
            })
            .unwrap_or(SaveOutcome::Discarded);
        Ok(outcome)
    }

    /// Turn the draft into a new composed bouquet with one unit in the cart.
    #[instrument(skip(self), fields(shopper_id = %shopper), err)]
    pub async fn pack(
        &self,
        shopper: ShopperId,
        packaging: Packaging,
    ) -> EngineResult<PackedBouquet> {
        let _guard = self.locks.acquire(shopper).await;
        let basket = self.basket(shopper).await?;
        if basket.snapshot().draft.is_empty() {
            return Err(EngineError::EmptyDraft);
        }

        let lines = self.store.draft_lines(shopper).await?;
        let composition = Composition::new(lines, packaging, self.packaging_fee)?;

        let first = self.namer.suffix();
        let (name, receipt) = match self.try_pack(&basket, first, &composition).await {
            Err(EngineError::Store(StoreError::NameCollision(taken))) => {
                warn!(name = %taken, "bouquet name taken, retrying with another suffix");
                let second = retry_suffix(first, self.namer.suffix());
                match self.try_pack(&basket, second, &composition).await {
                    Err(EngineError::Store(StoreError::NameCollision(taken))) => {
                        return Err(EngineError::PackFailed(format!(
                            "bouquet name {taken:?} is already taken"
                        )));
                    }
                    other => other?,
                }
            }
            other => other?,
        };

        let id = receipt
            .created
            .ok_or_else(|| EngineError::Invariant("pack created no product".to_string()))?;
        info!(product_id = %id, %name, total = composition.total(), "bouquet packed");

        Ok(PackedBouquet {
            id,
            name,
            description: composition.description(),
            packaging,
            base_total: composition.base_total(),
            fee: composition.fee(),
            total: composition.total(),
        })
    }

    async fn try_pack(
        &self,
        basket: &Basket,
        suffix: u32,
        composition: &Composition,
    ) -> EngineResult<(String, CommitReceipt)> {
        let name = bouquet_name(suffix);
        let events = basket.handle(&BasketCommand::Pack {
            name: name.clone(),
            composition: composition.clone(),
        })?;
        let receipt = self.commit(basket.shopper(), &events).await?;
        Ok((name, receipt))
    }

    pub async fn builder_summary(&self, shopper: ShopperId) -> EngineResult<BuilderSummary> {
        let _guard = self.locks.acquire(shopper).await;
        let lines = self.store.draft_lines(shopper).await?;
        let draft_total = lines_total(&lines);
        let cart_total = lines_total(&self.store.cart_lines(shopper).await?);

        Ok(BuilderSummary {
            lines,
            draft_total,
            cart_total,
            grand_total: draft_total.saturating_add(cart_total),
            editing: self.sessions.get(shopper),
        })
    }

    /// Delete composed bouquets nobody references any more. Bouquets open in an edit
    /// session are kept.
    #[instrument(skip(self), err)]
    pub async fn purge_orphaned_bouquets(&self) -> EngineResult<Vec<ProductId>> {
        let protected = self.sessions.active_products();
        let purged = self.store.purge_orphaned_bouquets(&protected).await?;
        info!(count = purged.len(), "purged orphaned bouquets");
        Ok(purged)
    }
}
