use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Order, OrderItem, OrderStatus};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200))]
    pub recipient_name: String,
    #[validate(length(min = 5, max = 20))]
    pub recipient_phone: String,
    #[validate(length(min = 1, max = 200))]
    pub city: String,
    #[validate(length(min = 1, max = 300))]
    pub warehouse: String,
    pub city_ref: Option<String>,
    pub warehouse_ref: Option<String>,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
