use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post, put},
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        attributes::{ProductAttributeList, SetProductAttributesRequest},
        products::{
            CreateProductRequest, ProductDetails, ProductImageList, ProductList,
            ReorderImagesRequest, UpdateProductRequest,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::{
        attribute_service,
        image_service::{self, UploadedImage},
        product_service,
    },
    state::AppState,
};

/// Multipart form accepted by the image upload endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUpload {
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/{id}/attributes",
            get(product_attributes).put(set_product_attributes),
        )
        .route("/{id}/images", post(upload_images))
        .route("/{id}/images/order", put(reorder_images))
        .route("/{id}/images/{image_id}", delete(delete_image))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Filtered product page", body = ApiResponse<ProductList>),
        (status = 400, description = "Invalid filter"),
        (status = 404, description = "Category not found"),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product with category, images and attributes", body = ApiResponse<ProductDetails>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetails>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/attributes",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Attribute values of the product", body = ApiResponse<ProductAttributeList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn product_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductAttributeList>>> {
    let resp = attribute_service::product_values(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/attributes",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = SetProductAttributesRequest,
    responses(
        (status = 200, description = "Attribute values replaced", body = ApiResponse<ProductAttributeList>),
        (status = 400, description = "Value does not match the category attributes"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn set_product_attributes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetProductAttributesRequest>,
) -> AppResult<Json<ApiResponse<ProductAttributeList>>> {
    let resp = attribute_service::set_product_values(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/images",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Images stored", body = ApiResponse<ProductImageList>),
        (status = 400, description = "Unsupported or empty file"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProductImageList>>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        files.push(UploadedImage {
            original_name,
            bytes: bytes.to_vec(),
        });
    }

    let resp = image_service::upload_images(&state, &user, id, files).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/images/order",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = ReorderImagesRequest,
    responses(
        (status = 200, description = "Images reordered", body = ApiResponse<ProductImageList>),
        (status = 400, description = "Ids are not a permutation of the product images"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn reorder_images(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderImagesRequest>,
) -> AppResult<Json<ApiResponse<ProductImageList>>> {
    let resp = image_service::reorder_images(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/images/{image_id}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Image not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = image_service::delete_image(&state, &user, id, image_id).await?;
    Ok(Json(resp))
}
