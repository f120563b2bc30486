use serde::Deserialize;
use serde_json::{Value, json};

use bloomcart_basket::AdjustMode;
use bloomcart_catalog::{LineItem, Product, lines_total};
use bloomcart_core::ProductId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AdjustDraftRequest {
    pub product_id: ProductId,
    pub mode: AdjustMode,
    /// Ignored for `clear`.
    #[serde(default)]
    pub delta: u32,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct PackRequest {
    #[serde(default = "yes")]
    pub with_packaging: bool,
}

impl Default for PackRequest {
    fn default() -> Self {
        Self {
            with_packaging: true,
        }
    }
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: Product) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "price": p.price,
        "description": p.description,
        "kind": p.kind.as_str(),
        "image": p.image,
    })
}

pub fn line_to_json(line: &LineItem) -> Value {
    json!({
        "product_id": line.product_id,
        "name": line.name,
        "unit_price": line.unit_price,
        "quantity": line.quantity,
        "subtotal": line.subtotal(),
        "kind": line.kind.as_str(),
    })
}

/// `{ "items": [...], "total": n }` for a draft or a cart.
pub fn lines_to_json(lines: &[LineItem]) -> Value {
    json!({
        "items": lines.iter().map(line_to_json).collect::<Vec<_>>(),
        "total": lines_total(lines),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomcart_catalog::ProductKind;

    #[test]
    fn adjust_request_defaults_delta() {
        let req: AdjustDraftRequest =
            serde_json::from_value(json!({"product_id": 3, "mode": "clear"})).unwrap();
        assert_eq!(req.product_id, ProductId::new(3));
        assert_eq!(req.mode, AdjustMode::Clear);
        assert_eq!(req.delta, 0);
    }

    #[test]
    fn cart_and_pack_requests_have_defaults() {
        let add: AddCartItemRequest = serde_json::from_value(json!({"product_id": 1})).unwrap();
        assert_eq!(add.quantity, 1);

        let pack: PackRequest = serde_json::from_value(json!({})).unwrap();
        assert!(pack.with_packaging);
    }

    #[test]
    fn lines_json_carries_subtotals_and_total() {
        let value = lines_to_json(&[rose_line(3)]);
        assert_eq!(value["items"][0]["subtotal"], 660);
        assert_eq!(value["items"][0]["kind"], "single_flower");
        assert_eq!(value["total"], 660);
    }

    fn rose_line(quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(1),
            name: "Розы".to_string(),
            unit_price: 220,
            quantity,
            kind: ProductKind::SingleFlower,
            description: String::new(),
        }
    }
}
