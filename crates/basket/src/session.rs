use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomcart_core::ProductId;

/// Marker that a shopper re-opened a packed bouquet for modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub product_id: ProductId,
    pub started_at: DateTime<Utc>,
}

impl EditSession {
    pub fn new(product_id: ProductId, started_at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            started_at,
        }
    }
}
