//! Basket domain module: a shopper's bouquet draft, cart and edit session.
//!
//! [`Basket`] is a pure decision model. It turns a [`BasketCommand`] into the
//! [`BasketEvent`]s a store must commit, and performs no IO itself.

pub mod basket;
pub mod draft;
pub mod session;

pub use basket::{Basket, BasketCommand, BasketEvent, BasketSnapshot};
pub use draft::{AdjustMode, adjusted_quantity};
pub use session::EditSession;
