use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::attributes::{AttributeList, CreateAttributeRequest, CreateOptionRequest, UpdateAttributeRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Attribute, AttributeOption, AttributeWithOptions},
    response::ApiResponse,
    services::attribute_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attributes).post(create_attribute))
        .route("/options/{option_id}", delete(delete_option))
        .route(
            "/{id}",
            get(get_attribute).put(update_attribute).delete(delete_attribute),
        )
        .route("/{id}/options", post(add_option))
}

#[utoipa::path(
    get,
    path = "/api/attributes",
    responses(
        (status = 200, description = "All attributes", body = ApiResponse<AttributeList>),
    ),
    tag = "Attributes"
)]
pub async fn list_attributes(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<AttributeList>>> {
    let resp = attribute_service::list_attributes(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/attributes/{id}",
    params(
        ("id" = Uuid, Path, description = "Attribute ID")
    ),
    responses(
        (status = 200, description = "Attribute with its options", body = ApiResponse<AttributeWithOptions>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Attributes"
)]
pub async fn get_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AttributeWithOptions>>> {
    let resp = attribute_service::get_attribute(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/attributes",
    request_body = CreateAttributeRequest,
    responses(
        (status = 200, description = "Attribute created", body = ApiResponse<Attribute>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attributes"
)]
pub async fn create_attribute(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAttributeRequest>,
) -> AppResult<Json<ApiResponse<Attribute>>> {
    let resp = attribute_service::create_attribute(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/attributes/{id}",
    params(
        ("id" = Uuid, Path, description = "Attribute ID")
    ),
    request_body = UpdateAttributeRequest,
    responses(
        (status = 200, description = "Attribute updated", body = ApiResponse<Attribute>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Type change while values exist"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attributes"
)]
pub async fn update_attribute(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAttributeRequest>,
) -> AppResult<Json<ApiResponse<Attribute>>> {
    let resp = attribute_service::update_attribute(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/attributes/{id}",
    params(
        ("id" = Uuid, Path, description = "Attribute ID")
    ),
    responses(
        (status = 200, description = "Attribute deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Attribute still bound to a category"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attributes"
)]
pub async fn delete_attribute(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = attribute_service::delete_attribute(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/attributes/{id}/options",
    params(
        ("id" = Uuid, Path, description = "Attribute ID")
    ),
    request_body = CreateOptionRequest,
    responses(
        (status = 200, description = "Option added", body = ApiResponse<AttributeOption>),
        (status = 400, description = "Attribute does not take options"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate option"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attributes"
)]
pub async fn add_option(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateOptionRequest>,
) -> AppResult<Json<ApiResponse<AttributeOption>>> {
    let resp = attribute_service::add_option(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/attributes/options/{option_id}",
    params(
        ("option_id" = Uuid, Path, description = "Option ID")
    ),
    responses(
        (status = 200, description = "Option deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Option in use"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attributes"
)]
pub async fn delete_option(
    State(state): State<AppState>,
    user: AuthUser,
    Path(option_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = attribute_service::delete_option(&state, &user, option_id).await?;
    Ok(Json(resp))
}
