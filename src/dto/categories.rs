use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Category, CategoryNode, EffectiveAttribute};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub priority: i32,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub slug: Option<String>,
    pub parent_id: Option<Uuid>,
    /// Detach the category from its parent.
    #[serde(default)]
    pub make_root: bool,
    pub priority: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BindAttributeRequest {
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_filterable: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryTree {
    #[schema(value_type = Vec<CategoryNode>)]
    pub items: Vec<CategoryNode>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EffectiveAttributeList {
    #[schema(value_type = Vec<EffectiveAttribute>)]
    pub items: Vec<EffectiveAttribute>,
}
