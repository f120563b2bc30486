//! Per-shopper serialization of basket transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use bloomcart_core::ShopperId;

/// One async mutex per shopper; different shoppers never wait on each other.
#[derive(Debug, Default)]
pub struct ShopperLocks {
    locks: Mutex<HashMap<ShopperId, Arc<AsyncMutex<()>>>>,
}

impl ShopperLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other transition of `shopper` is running.
    pub async fn acquire(&self, shopper: ShopperId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(shopper).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_shopper_waits() {
        let locks = Arc::new(ShopperLocks::new());
        let guard = locks.acquire(ShopperId::new(1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(ShopperId::new(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn other_shoppers_do_not_wait() {
        let locks = ShopperLocks::new();
        let _first = locks.acquire(ShopperId::new(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(ShopperId::new(2))).await;
        assert!(second.is_ok());
    }
}
