use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Category, Product, ProductAttribute, ProductImage};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub stock: i32,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderImagesRequest {
    pub image_ids: Vec<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductImageList {
    #[schema(value_type = Vec<ProductImage>)]
    pub items: Vec<ProductImage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetails {
    pub product: Product,
    pub category: Category,
    pub images: Vec<ProductImage>,
    pub attributes: Vec<ProductAttribute>,
}
