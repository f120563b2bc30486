//! Infrastructure layer: stores, edit sessions, per-shopper locking and the basket engine.

pub mod engine;
pub mod locks;
pub mod seed;
pub mod session;
pub mod store;


pub use engine::{
    BasketEngine, BuilderSummary, CheckoutReceipt, EditOpened, EngineError, EngineResult,
    PackedBouquet, SaveOutcome,
};
pub use locks::ShopperLocks;
pub use seed::seed_catalog;
pub use session::EditSessions;
pub use store::{
    BasketStore, Catalog, CommitReceipt, InMemoryShopStore, ShopStore, SqliteShopStore,
    StoreError, StoreResult,
};
