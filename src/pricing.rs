use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// A cart line joined with the current state of its product.
#[derive(Debug, Clone)]
pub struct CartLineSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub is_deleted: bool,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(String),
    #[error("product {0} is no longer available")]
    Unavailable(String),
    #[error("insufficient stock for product {name}: {available} left, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },
    #[error("order amount is too large")]
    Overflow,
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub fn line_total(price: i64, quantity: i32) -> Option<i64> {
    price.checked_mul(i64::from(quantity))
}

/// Validate every line against its product and sum the amounts.
pub fn price_lines(lines: Vec<CartLineSnapshot>) -> Result<PricedOrder, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut total: i64 = 0;
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        if line.quantity <= 0 {
            return Err(PricingError::InvalidQuantity(line.name));
        }
        if line.is_deleted {
            return Err(PricingError::Unavailable(line.name));
        }
        if line.stock < line.quantity {
            return Err(PricingError::InsufficientStock {
                name: line.name,
                available: line.stock,
                requested: line.quantity,
            });
        }

        let amount = line_total(line.price, line.quantity).ok_or(PricingError::Overflow)?;
        total = total.checked_add(amount).ok_or(PricingError::Overflow)?;

        priced.push(PricedLine {
            product_id: line.product_id,
            name: line.name,
            image: line.image,
            price: line.price,
            quantity: line.quantity,
            line_total: amount,
        });
    }

    Ok(PricedOrder {
        lines: priced,
        total,
    })
}
