use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems, Relation as CartRelation},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    pricing::{self, CartLineSnapshot},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::product_service,
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct CartProductRow {
    product_id: Uuid,
    quantity: i32,
    name: String,
    price: i64,
    stock: i32,
    is_deleted: bool,
}

/// Turns the caller's cart into a pending order.
///
/// Cart rows and their products stay locked until commit, so two checkouts
/// cannot both take the last unit.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    payload.validate()?;
    let txn = state.orm.begin().await?;

    let rows = CartItems::find()
        .select_only()
        .column_as(CartCol::ProductId, "product_id")
        .column_as(CartCol::Quantity, "quantity")
        .join(JoinType::InnerJoin, CartRelation::Products.def())
        .column_as(ProdCol::Name, "name")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .column_as(ProdCol::IsDeleted, "is_deleted")
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .into_model::<CartProductRow>()
        .all(&txn)
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let mut images = product_service::main_images(&txn, &ids).await?;

    let snapshots = rows
        .into_iter()
        .map(|row| CartLineSnapshot {
            image: images.remove(&row.product_id),
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            is_deleted: row.is_deleted,
            quantity: row.quantity,
        })
        .collect();
    let priced = pricing::price_lines(snapshots)?;

    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(priced.total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        recipient_name: Set(payload.recipient_name),
        recipient_phone: Set(payload.recipient_phone),
        city: Set(payload.city),
        warehouse: Set(payload.warehouse),
        city_ref: Set(payload.city_ref),
        warehouse_ref: Set(payload.warehouse_ref),
        comment: Set(comment),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(priced.lines.len());
    for line in priced.lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            product_name: Set(line.name),
            product_image: Set(line.image),
            price: Set(line.price),
            quantity: Set(line.quantity),
            line_total: Set(line.line_total),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;

        items.push(order_item_from_entity(item));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, total = order.total_amount, "order created");

    audit::record(
        &state.pool,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    find_orders(state, Some(user.user_id), query).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Customers may cancel only while the order is still pending.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if parse_status(&order.status)? != OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "only pending orders can be cancelled".into(),
        ));
    }

    let order = transition(&txn, order, OrderStatus::Cancelled).await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

/// Shared by customer and admin listings; `user_id` narrows to one owner.
pub(crate) async fn find_orders(
    state: &AppState,
    user_id: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    }
    .order_by_asc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Moves an order to `next`, putting stock back when it gets cancelled.
/// The caller is expected to hold a row lock on the order.
pub(crate) async fn transition<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    next: OrderStatus,
) -> AppResult<OrderModel> {
    let current = parse_status(&order.status)?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "order cannot move from {current} to {next}"
        )));
    }

    if next == OrderStatus::Cancelled {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .all(conn)
            .await?;
        for item in items {
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
                .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
                .filter(ProdCol::Id.eq(item.product_id))
                .exec(conn)
                .await?;
        }
        tracing::debug!(order_id = %order.id, "stock restored for cancelled order");
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();
    Ok(OrderWithItems {
        order: order_from_entity(order)?,
        items,
    })
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: parse_status(&model.status)?,
        recipient_name: model.recipient_name,
        recipient_phone: model.recipient_phone,
        city: model.city,
        warehouse: model.warehouse,
        city_ref: model.city_ref,
        warehouse_ref: model.warehouse_ref,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        product_image: model.product_image,
        price: model.price,
        quantity: model.quantity,
        line_total: model.line_total,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_an_internal_error() {
        assert_eq!(parse_status("shipped").ok(), Some(OrderStatus::Shipped));
        assert!(matches!(parse_status("lost"), Err(AppError::Internal(_))));
    }
}
