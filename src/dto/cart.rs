use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_amount: i64,
}
