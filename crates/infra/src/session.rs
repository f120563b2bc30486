//! Per-shopper edit sessions.
//!
//! A session exists from `begin_edit` until pack, save-and-exit, discard or begin-new.
//! Sessions are in-process state: a restart forgets them, which leaves the shopper with
//! a plain draft (the cart is untouched).

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bloomcart_basket::{BasketEvent, EditSession};
use bloomcart_core::{ProductId, ShopperId};

#[derive(Debug, Default)]
pub struct EditSessions {
    inner: RwLock<HashMap<ShopperId, EditSession>>,
}

impl EditSessions {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written map entry.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ShopperId, EditSession>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ShopperId, EditSession>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, shopper: ShopperId) -> Option<EditSession> {
        self.read().get(&shopper).copied()
    }

    pub fn set(&self, shopper: ShopperId, session: EditSession) {
        self.write().insert(shopper, session);
    }

    pub fn clear(&self, shopper: ShopperId) -> Option<EditSession> {
        self.write().remove(&shopper)
    }

    /// Bouquets currently open for editing by anyone.
    pub fn active_products(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.read().values().map(|s| s.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Applies the session events of a committed transition.
    pub fn apply(&self, shopper: ShopperId, events: &[BasketEvent]) {
        for event in events {
            match event {
                BasketEvent::EditStarted(session) => self.set(shopper, *session),
                BasketEvent::EditEnded => {
                    self.clear(shopper);
                }
                _ => {}
            }
        }
    }
}
