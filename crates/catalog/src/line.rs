use serde::{Deserialize, Serialize};

use bloomcart_core::ProductId;

use crate::product::{Product, ProductKind};

/// A draft or cart line joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub kind: ProductKind,
    pub description: String,
}

impl LineItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            kind: product.kind,
            description: product.description.clone(),
        }
    }

    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

/// Sum of `quantity × unit_price` over `lines`; 0 for no lines.
pub fn lines_total(lines: &[LineItem]) -> u64 {
    lines
        .iter()
        .fold(0u64, |acc, line| acc.saturating_add(line.subtotal()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, price: u64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: format!("product-{id}"),
            unit_price: price,
            quantity,
            kind: ProductKind::SingleFlower,
            description: String::new(),
        }
    }

    #[test]
    fn total_is_exact_integer_sum() {
        let lines = vec![line(1, 220, 3), line(2, 180, 2)];
        assert_eq!(lines_total(&lines), 1020);
    }

    #[test]
    fn empty_total_is_zero() {
        assert_eq!(lines_total(&[]), 0);
    }
}
