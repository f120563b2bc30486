//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (validation, invariants, missing references).
/// Storage failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a zero delta).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced product does not exist in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product exists but is not a composed bouquet.
    #[error("product {0} is not a composed bouquet")]
    NotComposedBouquet(ProductId),

    /// The bouquet is not in the shopper's own cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Only single flowers go into a bouquet draft.
    #[error("product {0} is not a single flower")]
    NotAFlower(ProductId),

    /// Packing was requested with nothing in the draft.
    #[error("the bouquet draft is empty")]
    EmptyDraft,

    /// Checkout was requested with nothing in the cart.
    #[error("the cart is empty")]
    EmptyCart,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
