use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/bouquets/purge-orphans", post(purge_orphans))
}

/// POST /admin/bouquets/purge-orphans
pub async fn purge_orphans(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine().purge_orphaned_bouquets().await {
        Ok(purged) => (
            StatusCode::OK,
            Json(serde_json::json!({ "purged": purged })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
