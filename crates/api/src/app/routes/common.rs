use axum::http::StatusCode;

use bloomcart_core::{ProductId, ShopperId};

use crate::app::errors;

pub fn parse_shopper(raw: &str) -> Result<ShopperId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid shopper id"))
}

pub fn parse_product(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_numeric_ids() {
        assert_eq!(parse_shopper("42").unwrap(), ShopperId::new(42));
        assert_eq!(parse_product("abc").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_shopper("").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
