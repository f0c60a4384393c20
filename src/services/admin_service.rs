use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        auth::{SetRoleRequest, UserList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::ProductList,
    },
    entity::{
        orders::Entity as Orders,
        products::{Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_USER, ensure_admin},
    models::{Order, User},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, OrderListQuery, Pagination},
    services::{auth_service, order_service, product_service},
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    order_service::find_orders(state, None, query).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = order_service::with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let from = existing.status.clone();

    let order = order_service::transition(&txn, existing, payload.status).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, from = %from, to = %payload.status, "order status changed");

    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": from, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_service::order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .order_by_asc(UserCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(auth_service::user_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn set_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetRoleRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let role = payload.role.trim().to_lowercase();
    if role != ROLE_ADMIN && role != ROLE_USER {
        return Err(AppError::BadRequest(format!("unknown role: {role}")));
    }
    if id == user.user_id && role != ROLE_ADMIN {
        return Err(AppError::BadRequest("admins cannot demote themselves".into()));
    }

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    active.role = Set(role.clone());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Role updated",
        auth_service::user_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::IsDeleted.eq(false))
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt)
        .order_by_asc(ProdCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = product_service::with_main_images(&state.orm, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}
