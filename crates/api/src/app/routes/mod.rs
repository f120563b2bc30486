use axum::{routing::get, Router};

pub mod admin;
pub mod builder;
pub mod cart;
pub mod common;
pub mod draft;
pub mod products;
pub mod system;

/// Full router. Shopper-scoped routes live under `/shoppers/:shopper`.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/products", products::router())
        .nest("/shoppers/:shopper/draft", draft::router())
        .nest("/shoppers/:shopper/cart", cart::router())
        .nest("/shoppers/:shopper/builder", builder::router())
        .nest("/admin", admin::router())
}
