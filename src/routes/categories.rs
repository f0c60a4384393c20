use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::categories::{
        BindAttributeRequest, CategoryList, CategoryTree, CreateCategoryRequest,
        EffectiveAttributeList, UpdateCategoryRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Category,
    response::ApiResponse,
    services::{attribute_service, category_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/tree", get(category_tree))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/{id}/attributes", get(category_attributes))
        .route(
            "/{id}/attributes/{attribute_id}",
            put(bind_attribute).delete(unbind_attribute),
        )
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All live categories", body = ApiResponse<CategoryList>),
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/tree",
    responses(
        (status = 200, description = "Category hierarchy", body = ApiResponse<CategoryTree>),
    ),
    tag = "Categories"
)]
pub async fn category_tree(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryTree>>> {
    let resp = category_service::category_tree(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category", body = ApiResponse<Category>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::get_category(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Validation failed or parent missing"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::create_category(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 400, description = "Invalid parent"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::update_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category and its subtree deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = category_service::delete_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/attributes",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Attributes in force, including inherited ones", body = ApiResponse<EffectiveAttributeList>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Categories"
)]
pub async fn category_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EffectiveAttributeList>>> {
    let resp = attribute_service::effective_attributes(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}/attributes/{attribute_id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("attribute_id" = Uuid, Path, description = "Attribute ID")
    ),
    request_body = BindAttributeRequest,
    responses(
        (status = 200, description = "Binding saved", body = ApiResponse<EffectiveAttributeList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn bind_attribute(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, attribute_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<BindAttributeRequest>,
) -> AppResult<Json<ApiResponse<EffectiveAttributeList>>> {
    let resp = attribute_service::bind_attribute(&state, &user, id, attribute_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}/attributes/{attribute_id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("attribute_id" = Uuid, Path, description = "Attribute ID")
    ),
    responses(
        (status = 200, description = "Binding removed", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn unbind_attribute(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, attribute_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = attribute_service::unbind_attribute(&state, &user, id, attribute_id).await?;
    Ok(Json(resp))
}
