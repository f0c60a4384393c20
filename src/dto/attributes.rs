use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Attribute, AttributeType, ProductAttribute};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAttributeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    pub data_type: AttributeType,
    #[validate(length(max = 20))]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAttributeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub unit: Option<String>,
    pub data_type: Option<AttributeType>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 100))]
    pub value: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// One attribute's value for a product; only the field matching the
/// attribute type is read.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttributeValueInput {
    pub attribute_id: Uuid,
    pub value_text: Option<String>,
    pub value_number: Option<f64>,
    pub value_bool: Option<bool>,
    #[serde(default)]
    pub option_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetProductAttributesRequest {
    pub values: Vec<AttributeValueInput>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AttributeList {
    #[schema(value_type = Vec<Attribute>)]
    pub items: Vec<Attribute>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductAttributeList {
    #[schema(value_type = Vec<ProductAttribute>)]
    pub items: Vec<ProductAttribute>,
}
