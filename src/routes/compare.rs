use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::compare::{AddCompareRequest, CompareList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CompareItem,
    response::ApiResponse,
    services::compare_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_compare).post(add_compare).delete(clear_compare))
        .route("/{product_id}", delete(remove_compare))
}

#[utoipa::path(
    get,
    path = "/api/compare",
    responses(
        (status = 200, description = "Comparison tables grouped by category", body = ApiResponse<CompareList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Compare"
)]
pub async fn list_compare(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CompareList>>> {
    let resp = compare_service::list_compare(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/compare",
    request_body = AddCompareRequest,
    responses(
        (status = 200, description = "Added, or already compared", body = ApiResponse<CompareItem>),
        (status = 400, description = "Product not found or category is full"),
    ),
    security(("bearer_auth" = [])),
    tag = "Compare"
)]
pub async fn add_compare(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddCompareRequest>,
) -> AppResult<Json<ApiResponse<CompareItem>>> {
    let resp = compare_service::add_compare(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/compare/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from comparison", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not compared"),
    ),
    security(("bearer_auth" = [])),
    tag = "Compare"
)]
pub async fn remove_compare(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = compare_service::remove_compare(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/compare",
    responses(
        (status = 200, description = "Comparison cleared", body = ApiResponse<serde_json::Value>),
    ),
    security(("bearer_auth" = [])),
    tag = "Compare"
)]
pub async fn clear_compare(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = compare_service::clear_compare(&state, &user).await?;
    Ok(Json(resp))
}
