//! Draft quantity arithmetic.

use serde::{Deserialize, Serialize};

use bloomcart_core::{DomainError, DomainResult};

/// How a draft adjustment combines with the current quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    Add,
    Subtract,
    Clear,
}

/// Quantity after applying `delta` in `mode` to `current`.
///
/// Results at or below zero come back as 0, meaning "no line". `delta` is a
/// magnitude; it must be positive for `Add` and `Subtract` and is ignored by `Clear`.
pub fn adjusted_quantity(current: u32, mode: AdjustMode, delta: u32) -> DomainResult<u32> {
    match mode {
        AdjustMode::Add | AdjustMode::Subtract if delta == 0 => {
            Err(DomainError::validation("delta must be positive"))
        }
        AdjustMode::Add => current
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("draft quantity overflows")),
        AdjustMode::Subtract => Ok(current.saturating_sub(delta)),
        AdjustMode::Clear => Ok(0),
    }
}
