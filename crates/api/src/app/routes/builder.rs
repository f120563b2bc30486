//! The bouquet builder: start, edit, save, discard and pack.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use bloomcart_catalog::Packaging;

use crate::app::routes::common::{parse_product, parse_shopper};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(summary))
        .route("/new", post(begin_new))
        .route("/edit/:product", post(begin_edit))
        .route("/discard", post(discard))
        .route("/save", post(save))
        .route("/pack", post(pack))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().builder_summary(shopper).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn begin_new(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().begin_new(shopper).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn begin_edit(
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
    match services.engine().begin_edit(shopper, product_id).await {
        Ok(opened) => (StatusCode::OK, Json(opened)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn discard(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().discard_and_exit(shopper).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn save(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.engine().save_and_exit(shopper).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// The body is optional; packaging defaults to wrapped.
pub async fn pack(
    Extension(services): Extension<Arc<AppServices>>,
    Path(shopper): Path<String>,
    body: Option<Json<dto::PackRequest>>,
) -> axum::response::Response {
    let shopper = match parse_shopper(&shopper) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let packaging = Packaging::from_flag(body.with_packaging);

    match services.engine().pack(shopper, packaging).await {
        Ok(packed) => (StatusCode::CREATED, Json(packed)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
