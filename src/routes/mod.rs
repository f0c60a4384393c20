use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::{
    response::{ApiResponse, Meta},
    services::image_service::UPLOADS_ROUTE,
    state::AppState,
};

pub mod admin;
pub mod attributes;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod compare;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod shipping;

// Multipart framing and the other form fields ride on top of the file bytes.
pub const BODY_LIMIT_SLACK: usize = 64 * 1024;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/attributes", attributes::router())
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/favorites", favorites::router())
        .nest("/compare", compare::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
        .nest("/shipping", shipping::router())
}

/// Full application: API, health, docs, uploaded files and request limits.
///
/// The extractor limit is raised to the same size as the tower-http limit,
/// otherwise `Multipart` stops at axum's 2 MiB default.
pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(BODY_LIMIT_SLACK);
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .nest_service(UPLOADS_ROUTE, uploads)
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
