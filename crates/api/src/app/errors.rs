use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use bloomcart_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::EmptyDraft => json_error(
            StatusCode::CONFLICT,
            "empty_draft",
            "add some flowers to the bouquet first",
        ),
        EngineError::EmptyCart => json_error(StatusCode::CONFLICT, "empty_cart", "the cart is empty"),
        EngineError::ProductNotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product {id} not found"),
        ),
        EngineError::NotComposedBouquet(id) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "not_composed_bouquet",
            format!("product {id} is not a composed bouquet and cannot be edited"),
        ),
        EngineError::NotInCart(id) => json_error(
            StatusCode::NOT_FOUND,
            "not_in_cart",
            format!("product {id} is not in your cart"),
        ),
        EngineError::NotAFlower(id) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "not_a_flower",
            format!("product {id} is not a single flower and cannot go into a bouquet"),
        ),
        EngineError::PackFailed(msg) => json_error(StatusCode::CONFLICT, "pack_failed", msg),
        EngineError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        EngineError::Invariant(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        EngineError::Store(e) => {
            error!(error = %e, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "something went wrong, please try again",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomcart_core::ProductId;
    use bloomcart_infra::StoreError;

    #[test]
    fn maps_engine_errors_to_statuses() {
        let cases = [
            (EngineError::EmptyDraft, StatusCode::CONFLICT),
            (EngineError::EmptyCart, StatusCode::CONFLICT),
            (EngineError::ProductNotFound(ProductId::new(1)), StatusCode::NOT_FOUND),
            (
                EngineError::NotComposedBouquet(ProductId::new(1)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (EngineError::NotInCart(ProductId::new(1)), StatusCode::NOT_FOUND),
            (EngineError::NotAFlower(ProductId::new(1)), StatusCode::UNPROCESSABLE_ENTITY),
            (EngineError::PackFailed("x".into()), StatusCode::CONFLICT),
            (EngineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::Invariant("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                EngineError::Store(StoreError::Backend("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(engine_error_to_response(err).status(), status);
        }
    }
}
