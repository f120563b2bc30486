//! `bloomcart-core`: shared domain building blocks.
//!
//! Identifiers and the domain error type. No IO, no storage concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, ShopperId};
