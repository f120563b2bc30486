use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bloomcart_infra::Catalog;

use crate::app::routes::common::parse_product;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let products = match services.engine().store().list().await {
        Ok(p) => p,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };
    let items = products.into_iter().map(dto::product_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().store().lookup_by_id(id).await {
        Ok(Some(p)) => (StatusCode::OK, Json(dto::product_to_json(p))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "product_not_found", "product not found"),
        Err(e) => errors::engine_error_to_response(e.into()),
    }
}
