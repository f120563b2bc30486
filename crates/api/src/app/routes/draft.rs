use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::routes::common::parse_shopper;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_draft))
        .route("/adjust", post(adjust_draft))
        .route("/reset", post(reset_draft))
}

pub async fn get_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().draft_lines(shopper).await {
        Ok(lines) => (StatusCode::OK, Json(dto::lines_to_json(&lines))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn adjust_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
    Json(body): Json<dto::AdjustDraftRequest>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match services
        .engine()
        .adjust_draft(shopper, body.product_id, body.mode, body.delta)
        .await
    {
        Ok(q) => q,
        Err(e) => return errors::engine_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "product_id": body.product_id,
            "quantity": quantity,
        })),
    )
        .into_response()
}

pub async fn reset_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().reset_draft(shopper).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
