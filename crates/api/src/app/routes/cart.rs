use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::app::routes::common::{parse_product, parse_shopper};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product", delete(remove_item))
        .route("/items/:product/decrement", post(decrement_item))
        .route("/checkout", post(checkout))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().cart_lines(shopper).await {
        Ok(lines) => (StatusCode::OK, Json(dto::lines_to_json(&lines))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
    Json(body): Json<dto::AddCartItemRequest>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .engine()
        .add_to_cart(shopper, body.product_id, body.quantity)
        .await
    {
        Ok(quantity) => (
            StatusCode::OK,
            Json(serde_json::json!({ "product_id": body.product_id, "quantity": quantity })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn decrement_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((shopper, product)): Path<(String, String)>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id = match parse_product(&product) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().decrement_cart(shopper, product_id).await {
        Ok(quantity) => (
            StatusCode::OK,
            Json(serde_json::json!({ "product_id": product_id, "quantity": quantity })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((shopper, product)): Path<(String, String)>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id = match parse_product(&product) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().remove_from_cart(shopper, product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().clear_cart(shopper).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Demo checkout: empties the cart and returns a receipt.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().checkout(shopper).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
