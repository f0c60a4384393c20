use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
    entity::cart_items::{ActiveModel, Column, Entity as CartItems, Model as CartModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    pricing,
    response::{ApiResponse, Meta},
    services::product_service,
    state::AppState,
};

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = build_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart", cart, Some(Meta::empty())))
}

/// Adds to an existing line for the same product instead of creating a second one.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    payload.validate()?;
    let product = product_service::require_live(&state.orm, payload.product_id).await?;

    let existing = find_line(state, user.user_id, payload.product_id).await?;
    let current = existing.as_ref().map(|l| l.quantity).unwrap_or(0);
    let quantity = current.saturating_add(payload.quantity);
    ensure_stock(&product.name, product.stock, quantity)?;

    match existing {
        Some(line) => {
            let mut active: ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?;
        }
        None => {
            ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await
            .map_err(|e| AppError::on_unique(e, "cart line was added concurrently, retry"))?;
        }
    }

    tracing::debug!(user_id = %user.user_id, product_id = %payload.product_id, quantity, "cart line saved");

    let cart = build_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", cart, Some(Meta::empty())))
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    payload.validate()?;
    let line = find_line(state, user.user_id, product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = product_service::require_live(&state.orm, product_id).await?;
    ensure_stock(&product.name, product.stock, payload.quantity)?;

    let mut active: ActiveModel = line.into();
    active.quantity = Set(payload.quantity);
    active.update(&state.orm).await?;

    let cart = build_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Updated", cart, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let res = CartItems::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let cart = build_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed", cart, Some(Meta::empty())))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    CartItems::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    Ok(ApiResponse::done("Cart cleared"))
}

async fn find_line(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<CartModel>> {
    Ok(CartItems::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .one(&state.orm)
        .await?)
}

fn ensure_stock(name: &str, stock: i32, quantity: i32) -> AppResult<()> {
    if quantity > stock {
        return Err(AppError::BadRequest(format!(
            "insufficient stock for product {name}: {stock} left, {quantity} requested"
        )));
    }
    Ok(())
}

/// Lines whose product has been deleted in the meantime are left out.
async fn build_view(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let lines = CartItems::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let mut products = product_service::load_live(&state.orm, &ids).await?;

    let mut items = Vec::with_capacity(lines.len());
    let mut total_quantity: i64 = 0;
    let mut total_amount: i64 = 0;
    for line in lines {
        let Some(product) = products.remove(&line.product_id) else {
            continue;
        };
        let line_total = pricing::line_total(product.price, line.quantity)
            .ok_or_else(|| AppError::BadRequest("cart amount is too large".into()))?;
        total_amount = total_amount
            .checked_add(line_total)
            .ok_or_else(|| AppError::BadRequest("cart amount is too large".into()))?;
        total_quantity += i64::from(line.quantity);
        items.push(CartLine {
            id: line.id,
            product,
            quantity: line.quantity,
            line_total,
        });
    }

    Ok(CartView {
        items,
        total_quantity,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_check_allows_exact_amount() {
        assert!(ensure_stock("Phone", 3, 3).is_ok());
        let err = ensure_stock("Phone", 3, 4).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Phone")));
    }
}
