use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCompareRequest {
    pub product_id: Uuid,
}

/// One line of the comparison table: `values[i]` belongs to `products[i]`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompareRow {
    pub attribute_id: Uuid,
    pub name: String,
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompareGroup {
    pub category: Category,
    pub products: Vec<Product>,
    pub rows: Vec<CompareRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompareList {
    pub groups: Vec<CompareGroup>,
}
