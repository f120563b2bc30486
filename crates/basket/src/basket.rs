use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomcart_catalog::{BouquetManifest, Component, Composition, NewProduct, ProductKind};
use bloomcart_core::{DomainError, ProductId, ShopperId};

use crate::draft::{AdjustMode, adjusted_quantity};
use crate::session::EditSession;

/// Persisted draft and cart quantities of one shopper.
///
/// Both maps only ever hold positive quantities; a missing key means "no line".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketSnapshot {
    pub draft: BTreeMap<ProductId, u32>,
    pub cart: BTreeMap<ProductId, u32>,
}

impl BasketSnapshot {
    /// Applies the draft/cart part of `event`.
    ///
    /// The cart line of a freshly packed bouquet needs the identifier the store
    /// assigned to it; stores add it with [`BasketSnapshot::record_packed`].
    pub fn apply(&mut self, event: &BasketEvent) {
        match event {
            BasketEvent::DraftLineSet {
                product_id,
                quantity,
            } => set_line(&mut self.draft, *product_id, *quantity),
            BasketEvent::DraftCleared => self.draft.clear(),
            BasketEvent::CartLineSet {
                product_id,
                quantity,
            } => set_line(&mut self.cart, *product_id, *quantity),
            BasketEvent::CartCleared => self.cart.clear(),
            BasketEvent::BouquetPacked { replaces, .. } => {
                if let Some(old) = replaces {
                    self.cart.remove(old);
                }
            }
            BasketEvent::BouquetRevised { .. }
            | BasketEvent::EditStarted(_)
            | BasketEvent::EditEnded => {}
        }
    }

    pub fn record_packed(&mut self, product_id: ProductId) {
        self.cart.insert(product_id, 1);
    }

    pub fn is_empty(&self) -> bool {
        self.draft.is_empty() && self.cart.is_empty()
    }
}

fn set_line(lines: &mut BTreeMap<ProductId, u32>, product_id: ProductId, quantity: u32) {
    if quantity == 0 {
        lines.remove(&product_id);
    } else {
        lines.insert(product_id, quantity);
    }
}

/// Commands a shopper can issue against their basket.
///
/// Catalog-dependent inputs (resolved manifest components, priced compositions,
/// generated names) are prepared by the caller, which keeps `handle` free of IO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasketCommand {
    AdjustDraft {
        product_id: ProductId,
        mode: AdjustMode,
        delta: u32,
    },
    ResetDraft,
    AddToCart {
        product_id: ProductId,
        quantity: u32,
    },
    DecrementCart {
        product_id: ProductId,
    },
    RemoveFromCart {
        product_id: ProductId,
    },
    ClearCart,
    Checkout,
    BeginNew,
    BeginEdit {
        product_id: ProductId,
        components: Vec<Component>,
        started_at: DateTime<Utc>,
    },
    DiscardAndExit,
    /// `composition` is `None` when nothing purchasable is left in the draft.
    SaveAndExit {
        composition: Option<Composition>,
    },
    Pack {
        name: String,
        composition: Composition,
    },
}

/// Facts decided by [`Basket::handle`], committed by a store in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BasketEvent {
    /// Quantity 0 removes the line.
    DraftLineSet {
        product_id: ProductId,
        quantity: u32,
    },
    DraftCleared,
    /// Quantity 0 removes the line.
    CartLineSet {
        product_id: ProductId,
        quantity: u32,
    },
    CartCleared,
    /// Creates the composed bouquet, puts one of it in the cart and drops the cart
    /// line of the bouquet it supersedes (the superseded product row stays).
    BouquetPacked {
        bouquet: NewProduct,
        manifest: BouquetManifest,
        replaces: Option<ProductId>,
    },
    /// Rewrites an existing composed bouquet in place.
    BouquetRevised {
        product_id: ProductId,
        price: u64,
        description: String,
        manifest: BouquetManifest,
    },
    EditStarted(EditSession),
    EditEnded,
}

impl BasketEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BasketEvent::DraftLineSet { .. } => "basket.draft.line_set",
            BasketEvent::DraftCleared => "basket.draft.cleared",
            BasketEvent::CartLineSet { .. } => "basket.cart.line_set",
            BasketEvent::CartCleared => "basket.cart.cleared",
            BasketEvent::BouquetPacked { .. } => "basket.bouquet.packed",
            BasketEvent::BouquetRevised { .. } => "basket.bouquet.revised",
            BasketEvent::EditStarted(_) => "basket.edit.started",
            BasketEvent::EditEnded => "basket.edit.ended",
        }
    }

    /// Session events change the shopper's edit session, not stored rows.
    pub fn is_session_event(&self) -> bool {
        matches!(self, BasketEvent::EditStarted(_) | BasketEvent::EditEnded)
    }
}

/// A shopper's basket as seen by one transition: stored lines plus the edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basket {
    shopper: ShopperId,
    snapshot: BasketSnapshot,
    editing: Option<EditSession>,
}

impl Basket {
    pub fn new(shopper: ShopperId, snapshot: BasketSnapshot, editing: Option<EditSession>) -> Self {
        Self {
            shopper,
            snapshot,
            editing,
        }
    }

    pub fn empty(shopper: ShopperId) -> Self {
        Self::new(shopper, BasketSnapshot::default(), None)
    }

    pub fn shopper(&self) -> ShopperId {
        self.shopper
    }

    pub fn snapshot(&self) -> &BasketSnapshot {
        &self.snapshot
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn draft_quantity(&self, product_id: ProductId) -> u32 {
        self.snapshot.draft.get(&product_id).copied().unwrap_or(0)
    }

    pub fn cart_quantity(&self, product_id: ProductId) -> u32 {
        self.snapshot.cart.get(&product_id).copied().unwrap_or(0)
    }

    /// Draft and cart as they will look once `events` are committed.
    pub fn preview(&self, events: &[BasketEvent]) -> BasketSnapshot {
        let mut snapshot = self.snapshot.clone();
        for e in events {
            snapshot.apply(e);
        }
        snapshot
    }

    /// Decide which events `command` produces. Never mutates the basket.
    pub fn handle(&self, command: &BasketCommand) -> Result<Vec<BasketEvent>, DomainError> {
        match command {
            BasketCommand::AdjustDraft {
                product_id,
                mode,
                delta,
            } => self.handle_adjust(*product_id, *mode, *delta),
            BasketCommand::ResetDraft => Ok(self.clear_draft().into_iter().collect()),
            BasketCommand::AddToCart {
                product_id,
                quantity,
            } => self.handle_add_to_cart(*product_id, *quantity),
            BasketCommand::DecrementCart { product_id } => {
                Ok(self.handle_decrement(*product_id))
            }
            BasketCommand::RemoveFromCart { product_id } => {
                if self.snapshot.cart.contains_key(product_id) {
                    Ok(vec![BasketEvent::CartLineSet {
                        product_id: *product_id,
                        quantity: 0,
                    }])
                } else {
                    Ok(vec![])
                }
            }
            BasketCommand::ClearCart => {
                if self.snapshot.cart.is_empty() {
                    Ok(vec![])
                } else {
                    Ok(vec![BasketEvent::CartCleared])
                }
            }
            BasketCommand::Checkout => {
                if self.snapshot.cart.is_empty() {
                    return Err(DomainError::EmptyCart);
                }
                Ok(vec![BasketEvent::CartCleared])
            }
            BasketCommand::BeginNew | BasketCommand::DiscardAndExit => Ok(self.exit_builder()),
            BasketCommand::BeginEdit {
                product_id,
                components,
                started_at,
            } => self.handle_begin_edit(*product_id, components, *started_at),
            BasketCommand::SaveAndExit { composition } => {
                Ok(self.handle_save_and_exit(composition.as_ref()))
            }
            BasketCommand::Pack { name, composition } => self.handle_pack(name, composition),
        }
    }

    fn clear_draft(&self) -> Option<BasketEvent> {
        (!self.snapshot.draft.is_empty()).then_some(BasketEvent::DraftCleared)
    }

    fn end_edit(&self) -> Option<BasketEvent> {
        self.editing.map(|_| BasketEvent::EditEnded)
    }

    fn exit_builder(&self) -> Vec<BasketEvent> {
        self.clear_draft().into_iter().chain(self.end_edit()).collect()
    }

    fn handle_adjust(
        &self,
        product_id: ProductId,
        mode: AdjustMode,
        delta: u32,
    ) -> Result<Vec<BasketEvent>, DomainError> {
        let current = self.draft_quantity(product_id);
        let quantity = adjusted_quantity(current, mode, delta)?;
        if quantity == current {
            return Ok(vec![]);
        }
        Ok(vec![BasketEvent::DraftLineSet {
            product_id,
            quantity,
        }])
    }

    fn handle_add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<BasketEvent>, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let quantity = self
            .cart_quantity(product_id)
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("cart quantity overflows"))?;
        Ok(vec![BasketEvent::CartLineSet {
            product_id,
            quantity,
        }])
    }

    fn handle_decrement(&self, product_id: ProductId) -> Vec<BasketEvent> {
        match self.snapshot.cart.get(&product_id) {
            Some(&quantity) => vec![BasketEvent::CartLineSet {
                product_id,
                quantity: quantity - 1,
            }],
            None => vec![],
        }
    }

    fn handle_begin_edit(
        &self,
        product_id: ProductId,
        components: &[Component],
        started_at: DateTime<Utc>,
    ) -> Result<Vec<BasketEvent>, DomainError> {
        // Only the shopper holding the bouquet may reopen it.
        if self.cart_quantity(product_id) == 0 {
            return Err(DomainError::NotInCart(product_id));
        }

        // A manifest may list one product twice; the draft holds one line per product.
        let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
        for c in components.iter().filter(|c| c.quantity > 0) {
            let entry = merged.entry(c.product_id).or_insert(0);
            *entry = entry.saturating_add(c.quantity);
        }

        let mut events: Vec<BasketEvent> = self.clear_draft().into_iter().collect();
        events.extend(
            merged
                .into_iter()
                .map(|(product_id, quantity)| BasketEvent::DraftLineSet {
                    product_id,
                    quantity,
                }),
        );
        events.push(BasketEvent::EditStarted(EditSession::new(product_id, started_at)));
        Ok(events)
    }

    fn handle_save_and_exit(&self, composition: Option<&Composition>) -> Vec<BasketEvent> {
        let Some(session) = self.editing else {
            return self.exit_builder();
        };

        let mut events = Vec::new();
        match composition {
            Some(c) => events.push(BasketEvent::BouquetRevised {
                product_id: session.product_id,
                price: c.total(),
                description: c.description(),
                manifest: c.manifest(),
            }),
            None => {
                if self.snapshot.cart.contains_key(&session.product_id) {
                    events.push(BasketEvent::CartLineSet {
                        product_id: session.product_id,
                        quantity: 0,
                    });
                }
            }
        }
        events.extend(self.exit_builder());
        events
    }

    fn handle_pack(
        &self,
        name: &str,
        composition: &Composition,
    ) -> Result<Vec<BasketEvent>, DomainError> {
        if self.snapshot.draft.is_empty() {
            return Err(DomainError::EmptyDraft);
        }

        let bouquet = NewProduct::new(name, composition.total(), ProductKind::ComposedBouquet)
            .with_description(composition.description());
        bouquet.validate()?;

        let mut events = vec![
            BasketEvent::BouquetPacked {
                bouquet,
                manifest: composition.manifest(),
                replaces: self.editing.map(|s| s.product_id),
            },
            BasketEvent::DraftCleared,
        ];
        events.extend(self.end_edit());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomcart_catalog::{LineItem, Packaging};

    const ROSE: ProductId = ProductId::new(1);
    const TULIP: ProductId = ProductId::new(2);
    const PACKED: ProductId = ProductId::new(100);

    fn shopper() -> ShopperId {
        ShopperId::new(42)
    }

    fn line(product_id: ProductId, name: &str, price: u64, quantity: u32) -> LineItem {
        LineItem {
            product_id,
            name: name.to_string(),
            unit_price: price,
            quantity,
            kind: ProductKind::SingleFlower,
            description: String::new(),
        }
    }

    fn composition(packaging: Packaging) -> Composition {
        Composition::new(
            vec![line(ROSE, "Розы", 220, 3), line(TULIP, "Тюльпаны", 180, 2)],
            packaging,
            15,
        )
        .unwrap()
    }

    fn with_draft(editing: Option<EditSession>) -> Basket {
        let mut snapshot = BasketSnapshot::default();
        snapshot.draft.insert(ROSE, 3);
        snapshot.draft.insert(TULIP, 2);
        snapshot.cart.insert(PACKED, 1);
        Basket::new(shopper(), snapshot, editing)
    }

    fn editing_packed() -> Option<EditSession> {
        Some(EditSession::new(PACKED, Utc::now()))
    }

    fn replay(basket: &Basket, events: &[BasketEvent]) -> BasketSnapshot {
        basket.preview(events)
    }

    #[test]
    fn adjust_emits_resulting_quantity() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::AdjustDraft {
                product_id: ROSE,
                mode: AdjustMode::Add,
                delta: 10,
            })
            .unwrap();
        assert_eq!(
            events,
            vec![BasketEvent::DraftLineSet {
                product_id: ROSE,
                quantity: 13
            }]
        );
    }

    #[test]
    fn adjust_to_zero_removes_line() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::AdjustDraft {
                product_id: TULIP,
                mode: AdjustMode::Subtract,
                delta: 5,
            })
            .unwrap();
        let after = replay(&basket, &events);
        assert!(!after.draft.contains_key(&TULIP));
        assert_eq!(after.draft.get(&ROSE), Some(&3));
    }

    #[test]
    fn subtract_on_absent_line_is_a_no_op() {
        let basket = Basket::empty(shopper());
        let events = basket
            .handle(&BasketCommand::AdjustDraft {
                product_id: ROSE,
                mode: AdjustMode::Subtract,
                delta: 1,
            })
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn reset_is_idempotent() {
        let basket = with_draft(None);
        let events = basket.handle(&BasketCommand::ResetDraft).unwrap();
        assert_eq!(events, vec![BasketEvent::DraftCleared]);

        let once = Basket::new(shopper(), replay(&basket, &events), None);
        assert!(once.handle(&BasketCommand::ResetDraft).unwrap().is_empty());
    }

    #[test]
    fn decrement_removes_last_unit_and_ignores_absent_lines() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::DecrementCart { product_id: PACKED })
            .unwrap();
        assert!(replay(&basket, &events).cart.is_empty());

        let none = basket
            .handle(&BasketCommand::DecrementCart { product_id: ROSE })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn add_to_cart_increments_existing_line() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::AddToCart {
                product_id: PACKED,
                quantity: 2,
            })
            .unwrap();
        assert_eq!(replay(&basket, &events).cart.get(&PACKED), Some(&3));

        let err = basket
            .handle(&BasketCommand::AddToCart {
                product_id: PACKED,
                quantity: 0,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn checkout_requires_items() {
        let err = Basket::empty(shopper())
            .handle(&BasketCommand::Checkout)
            .unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);

        let events = with_draft(None).handle(&BasketCommand::Checkout).unwrap();
        assert_eq!(events, vec![BasketEvent::CartCleared]);
    }

    #[test]
    fn pack_requires_a_draft() {
        let err = Basket::empty(shopper())
            .handle(&BasketCommand::Pack {
                name: "Авторский букет №12345".to_string(),
                composition: composition(Packaging::Wrapped),
            })
            .unwrap_err();
        assert_eq!(err, DomainError::EmptyDraft);
    }

    #[test]
    fn pack_creates_priced_bouquet_and_clears_draft() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::Pack {
                name: "Авторский букет №12345".to_string(),
                composition: composition(Packaging::Wrapped),
            })
            .unwrap();

        match &events[0] {
            BasketEvent::BouquetPacked {
                bouquet,
                manifest,
                replaces,
            } => {
                assert_eq!(bouquet.price, 1035);
                assert_eq!(bouquet.kind, ProductKind::ComposedBouquet);
                assert_eq!(bouquet.description, "Состав: Розы (3), Тюльпаны (2). В упаковке.");
                assert_eq!(manifest.components.len(), 2);
                assert_eq!(*replaces, None);
            }
            other => panic!("expected BouquetPacked, got {other:?}"),
        }
        assert_eq!(events[1], BasketEvent::DraftCleared);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn pack_while_editing_supersedes_the_edited_bouquet() {
        let basket = with_draft(editing_packed());
        let events = basket
            .handle(&BasketCommand::Pack {
                name: "Авторский букет №54321".to_string(),
                composition: composition(Packaging::Unwrapped),
            })
            .unwrap();

        assert!(matches!(
            &events[0],
            BasketEvent::BouquetPacked { replaces: Some(id), .. } if *id == PACKED
        ));
        assert_eq!(events.last(), Some(&BasketEvent::EditEnded));

        let mut after = replay(&basket, &events);
        after.record_packed(ProductId::new(101));
        assert!(after.draft.is_empty());
        assert_eq!(after.cart.keys().copied().collect::<Vec<_>>(), vec![ProductId::new(101)]);
    }

    #[test]
    fn begin_edit_rebuilds_draft_and_keeps_cart() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::BeginEdit {
                product_id: PACKED,
                components: vec![
                    Component { product_id: TULIP, quantity: 1 },
                    Component { product_id: ROSE, quantity: 2 },
                    Component { product_id: TULIP, quantity: 1 },
                ],
                started_at: Utc::now(),
            })
            .unwrap();

        assert_eq!(events[0], BasketEvent::DraftCleared);
        assert!(matches!(
            events.last(),
            Some(BasketEvent::EditStarted(s)) if s.product_id == PACKED
        ));

        let after = replay(&basket, &events);
        assert_eq!(after.draft.get(&ROSE), Some(&2));
        assert_eq!(after.draft.get(&TULIP), Some(&2));
        assert_eq!(after.cart.get(&PACKED), Some(&1));
    }

    #[test]
    fn begin_edit_requires_the_bouquet_in_own_cart() {
        let err = Basket::empty(shopper())
            .handle(&BasketCommand::BeginEdit {
                product_id: PACKED,
                components: vec![Component { product_id: ROSE, quantity: 1 }],
                started_at: Utc::now(),
            })
            .unwrap_err();
        assert_eq!(err, DomainError::NotInCart(PACKED));
    }

    #[test]
    fn discard_leaves_cart_untouched() {
        let basket = with_draft(editing_packed());
        let events = basket.handle(&BasketCommand::DiscardAndExit).unwrap();
        assert_eq!(events, vec![BasketEvent::DraftCleared, BasketEvent::EditEnded]);

        let after = replay(&basket, &events);
        assert!(after.draft.is_empty());
        assert_eq!(after.cart.get(&PACKED), Some(&1));
    }

    #[test]
    fn save_and_exit_revises_edited_bouquet_in_place() {
        let basket = with_draft(editing_packed());
        let events = basket
            .handle(&BasketCommand::SaveAndExit {
                composition: Some(composition(Packaging::Wrapped)),
            })
            .unwrap();

        match &events[0] {
            BasketEvent::BouquetRevised {
                product_id, price, ..
            } => {
                assert_eq!(*product_id, PACKED);
                assert_eq!(*price, 1035);
            }
            other => panic!("expected BouquetRevised, got {other:?}"),
        }
        assert!(!events.iter().any(|e| matches!(e, BasketEvent::BouquetPacked { .. })));
        assert_eq!(replay(&basket, &events).cart.get(&PACKED), Some(&1));
    }

    #[test]
    fn save_and_exit_with_empty_draft_drops_edited_bouquet_from_cart() {
        let mut snapshot = BasketSnapshot::default();
        snapshot.cart.insert(PACKED, 1);
        let basket = Basket::new(shopper(), snapshot, editing_packed());

        let events = basket
            .handle(&BasketCommand::SaveAndExit { composition: None })
            .unwrap();
        assert_eq!(
            events,
            vec![
                BasketEvent::CartLineSet {
                    product_id: PACKED,
                    quantity: 0
                },
                BasketEvent::EditEnded,
            ]
        );
    }

    #[test]
    fn save_and_exit_without_edit_discards() {
        let basket = with_draft(None);
        let events = basket
            .handle(&BasketCommand::SaveAndExit {
                composition: Some(composition(Packaging::Wrapped)),
            })
            .unwrap();
        assert_eq!(events, vec![BasketEvent::DraftCleared]);
    }

    #[test]
    fn begin_new_forgets_edit_session() {
        let basket = with_draft(editing_packed());
        let events = basket.handle(&BasketCommand::BeginNew).unwrap();
        assert_eq!(events, vec![BasketEvent::DraftCleared, BasketEvent::EditEnded]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn adjustment() -> impl Strategy<Value = (AdjustMode, u32)> {
            prop_oneof![
                (Just(AdjustMode::Add), 1u32..20),
                (Just(AdjustMode::Subtract), 1u32..20),
                (Just(AdjustMode::Clear), 0u32..2),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: the stored line always equals the clamped running quantity,
            /// so a non-positive net quantity never leaves a line behind.
            #[test]
            fn draft_line_tracks_clamped_net_quantity(
                steps in proptest::collection::vec(adjustment(), 1..40)
            ) {
                let mut snapshot = BasketSnapshot::default();
                let mut expected: u32 = 0;

                for (mode, delta) in steps {
                    let basket = Basket::new(shopper(), snapshot.clone(), None);
                    let events = basket
                        .handle(&BasketCommand::AdjustDraft { product_id: ROSE, mode, delta })
                        .unwrap();
                    for e in &events {
                        snapshot.apply(e);
                    }

                    expected = match mode {
                        AdjustMode::Add => expected + delta,
                        AdjustMode::Subtract => expected.saturating_sub(delta),
                        AdjustMode::Clear => 0,
                    };

                    if expected == 0 {
                        prop_assert!(!snapshot.draft.contains_key(&ROSE));
                    } else {
                        prop_assert_eq!(snapshot.draft.get(&ROSE), Some(&expected));
                    }
                }
            }

            /// Property: handle never mutates the basket.
            #[test]
            fn handle_is_pure(delta in 1u32..50) {
                let basket = with_draft(editing_packed());
                let before = basket.clone();
                let first = basket.handle(&BasketCommand::AdjustDraft {
                    product_id: TULIP,
                    mode: AdjustMode::Add,
                    delta,
                });
                let second = basket.handle(&BasketCommand::AdjustDraft {
                    product_id: TULIP,
                    mode: AdjustMode::Add,
                    delta,
                });
                prop_assert_eq!(&basket, &before);
                prop_assert_eq!(first, second);
            }
        }
    }
}
