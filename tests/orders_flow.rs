mod common;

use rozetka_api::{
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        compare::AddCompareRequest,
        favorites::AddFavoriteRequest,
        orders::{CreateOrderRequest, UpdateOrderStatusRequest},
        products::UpdateProductRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::OrderStatus,
    routes::params::{LowStockQuery, Pagination},
    services::{
        admin_service, cart_service, category_service, compare_service, favorite_service,
        order_service, product_service,
    },
    state::AppState,
};
use uuid::Uuid;

fn delivery() -> CreateOrderRequest {
    CreateOrderRequest {
        recipient_name: "Olena Shevchenko".into(),
        recipient_phone: "+380501234567".into(),
        city: "Kyiv".into(),
        warehouse: "Branch #12".into(),
        city_ref: Some("8d5a980d-391c-11dd-90d9-001a92567626".into()),
        warehouse_ref: None,
        comment: Some("  call before delivery  ".into()),
    }
}

async fn add(state: &AppState, user: &AuthUser, product_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_to_cart(state, user, AddToCartRequest { product_id, quantity }).await?;
    Ok(())
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let details = product_service::get_product(state, product_id)
        .await?
        .data
        .expect("product");
    Ok(details.product.stock)
}

#[tokio::test]
async fn cart_merges_lines_and_checks_stock() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let category = common::category(&state, &admin, "Audio", None).await?;
    let headphones = common::product(&state, &admin, category.id, "Headphones", 2_499_00, 3).await?;

    add(&state, &user, headphones.id, 1).await?;
    add(&state, &user, headphones.id, 1).await?;

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.total_quantity, 2);
    assert_eq!(cart.total_amount, 2 * 2_499_00);

    let err = add(&state, &user, headphones.id, 2).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::BadRequest(_))));

    let err = cart_service::update_quantity(
        &state,
        &user,
        headphones.id,
        UpdateCartItemRequest { quantity: 4 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let cart = cart_service::update_quantity(
        &state,
        &user,
        headphones.id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.total_amount, 3 * 2_499_00);

    cart_service::remove_from_cart(&state, &user, headphones.id).await?;
    assert!(matches!(
        cart_service::remove_from_cart(&state, &user, headphones.id).await,
        Err(AppError::NotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn deleted_products_leave_carts_and_favorites() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let category = common::category(&state, &admin, "Toys", None).await?;
    let kite = common::product(&state, &admin, category.id, "Kite", 300_00, 10).await?;
    let ball = common::product(&state, &admin, category.id, "Ball", 150_00, 10).await?;

    favorite_service::add_favorite(&state, &user, AddFavoriteRequest { product_id: kite.id }).await?;
    favorite_service::add_favorite(&state, &user, AddFavoriteRequest { product_id: kite.id }).await?;
    favorite_service::add_favorite(&state, &user, AddFavoriteRequest { product_id: ball.id }).await?;
    add(&state, &user, kite.id, 1).await?;

    let favorites = favorite_service::list_favorites(&state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites")
        .items;
    assert_eq!(favorites.len(), 2);

    product_service::delete_product(&state, &admin, kite.id).await?;

    let favorites = favorite_service::list_favorites(&state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites")
        .items;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, ball.id);

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    // The id comes from the request body, so an unknown product is a bad request.
    let err = favorite_service::add_favorite(&state, &user, AddFavoriteRequest { product_id: kite.id })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn compare_groups_products_by_category() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let phones = common::category(&state, &admin, "Phones", None).await?;
    let laptops = common::category(&state, &admin, "Laptops", None).await?;
    let a = common::product(&state, &admin, phones.id, "Phone A", 10_000_00, 5).await?;
    let b = common::product(&state, &admin, phones.id, "Phone B", 12_000_00, 5).await?;
    let c = common::product(&state, &admin, laptops.id, "Laptop C", 30_000_00, 5).await?;

    for id in [a.id, c.id, b.id, a.id] {
        compare_service::add_compare(&state, &user, AddCompareRequest { product_id: id }).await?;
    }

    let groups = compare_service::list_compare(&state, &user)
        .await?
        .data
        .expect("compare")
        .groups;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].category.id, phones.id);
    let ids: Vec<Uuid> = groups[0].products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(groups[1].products.len(), 1);

    compare_service::remove_compare(&state, &user, c.id).await?;
    let groups = compare_service::list_compare(&state, &user)
        .await?
        .data
        .expect("compare")
        .groups;
    assert_eq!(groups.len(), 1);

    compare_service::clear_compare(&state, &user).await?;
    let groups = compare_service::list_compare(&state, &user)
        .await?
        .data
        .expect("compare")
        .groups;
    assert!(groups.is_empty());

    Ok(())
}

#[tokio::test]
async fn checkout_snapshots_prices_and_cancel_restores_stock() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let category = common::category(&state, &admin, "Books", None).await?;
    let novel = common::product(&state, &admin, category.id, "Novel", 350_00, 5).await?;
    let atlas = common::product(&state, &admin, category.id, "Atlas", 1_200_00, 2).await?;

    let err = order_service::create_order(&state, &user, delivery())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    add(&state, &user, novel.id, 2).await?;
    add(&state, &user, atlas.id, 1).await?;

    let created = order_service::create_order(&state, &user, delivery())
        .await?
        .data
        .expect("order");
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.order.total_amount, 2 * 350_00 + 1_200_00);
    assert_eq!(created.order.comment.as_deref(), Some("call before delivery"));
    assert_eq!(created.items.len(), 2);

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(stock_of(&state, novel.id).await?, 3);
    assert_eq!(stock_of(&state, atlas.id).await?, 1);

    // Later price changes do not touch the order.
    product_service::update_product(
        &state,
        &admin,
        novel.id,
        UpdateProductRequest {
            price: Some(999_00),
            name: Some("Novel, 2nd edition".into()),
            ..Default::default()
        },
    )
    .await?;
    let stored = order_service::get_order(&state, &user, created.order.id)
        .await?
        .data
        .expect("order");
    let line = stored
        .items
        .iter()
        .find(|i| i.product_id == novel.id)
        .expect("novel line");
    assert_eq!(line.price, 350_00);
    assert_eq!(line.product_name, "Novel");
    assert_eq!(line.line_total, 700_00);

    // Orders are private to their owner.
    let stranger = common::customer(&state).await?;
    assert!(matches!(
        order_service::get_order(&state, &stranger, created.order.id).await,
        Err(AppError::NotFound)
    ));

    let cancelled = order_service::cancel_order(&state, &user, created.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&state, novel.id).await?, 5);
    assert_eq!(stock_of(&state, atlas.id).await?, 2);

    let err = order_service::cancel_order(&state, &user, created.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_through_allowed_statuses() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let category = common::category(&state, &admin, "Garden", None).await?;
    let rake = common::product(&state, &admin, category.id, "Rake", 450_00, 4).await?;

    add(&state, &user, rake.id, 4).await?;
    let order = order_service::create_order(&state, &user, delivery())
        .await?
        .data
        .expect("order")
        .order;

    let err = admin_service::update_order_status(
        &state,
        &user,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    for status in [OrderStatus::Confirmed, OrderStatus::Shipped] {
        let updated = admin_service::update_order_status(
            &state,
            &admin,
            order.id,
            UpdateOrderStatusRequest { status },
        )
        .await?
        .data
        .expect("order");
        assert_eq!(updated.status, status);
    }

    // Shipped orders can no longer be cancelled by anyone.
    assert!(matches!(
        order_service::cancel_order(&state, &user, order.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        admin_service::update_order_status(
            &state,
            &admin,
            order.id,
            UpdateOrderStatusRequest {
                status: OrderStatus::Cancelled,
            },
        )
        .await,
        Err(AppError::BadRequest(_))
    ));

    let low = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            threshold: Some(0),
            ..Default::default()
        },
    )
    .await?;
    let total = low.meta.as_ref().and_then(|m| m.total).unwrap_or_default();
    assert!(total >= 1);
    assert!(low.data.expect("products").items.iter().all(|p| p.stock <= 0));

    Ok(())
}

#[tokio::test]
async fn deleting_a_category_clears_its_products_from_lists() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let retired = common::category(&state, &admin, "Retired", None).await?;
    let kept = common::category(&state, &admin, "Kept", None).await?;
    let old = common::product(&state, &admin, retired.id, "Old radio", 800_00, 5).await?;
    let new = common::product(&state, &admin, kept.id, "New radio", 1_100_00, 5).await?;

    for id in [old.id, new.id] {
        add(&state, &user, id, 1).await?;
        favorite_service::add_favorite(&state, &user, AddFavoriteRequest { product_id: id }).await?;
        compare_service::add_compare(&state, &user, AddCompareRequest { product_id: id }).await?;
    }

    category_service::delete_category(&state, &admin, retired.id).await?;

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    let ids: Vec<Uuid> = cart.items.iter().map(|i| i.product.id).collect();
    assert_eq!(ids, vec![new.id]);

    let favorites = favorite_service::list_favorites(&state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites")
        .items;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, new.id);

    let groups = compare_service::list_compare(&state, &user)
        .await?
        .data
        .expect("compare")
        .groups;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].category.id, kept.id);

    // Checkout only sees the product that is still on sale.
    let order = order_service::create_order(&state, &user, delivery())
        .await?
        .data
        .expect("order");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.order.total_amount, 1_100_00);

    Ok(())
}

#[tokio::test]
async fn compare_list_holds_ten_products_per_category() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let tablets = common::category(&state, &admin, "Tablets", None).await?;
    let watches = common::category(&state, &admin, "Watches", None).await?;

    for n in 0..compare_service::MAX_PER_CATEGORY {
        let tablet = common::product(&state, &admin, tablets.id, &format!("Tablet {n}"), 9_000_00, 1).await?;
        compare_service::add_compare(&state, &user, AddCompareRequest { product_id: tablet.id }).await?;
    }

    let extra = common::product(&state, &admin, tablets.id, "Tablet extra", 9_000_00, 1).await?;
    let err = compare_service::add_compare(&state, &user, AddCompareRequest { product_id: extra.id })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // The cap is per category.
    let watch = common::product(&state, &admin, watches.id, "Watch", 6_000_00, 1).await?;
    compare_service::add_compare(&state, &user, AddCompareRequest { product_id: watch.id }).await?;

    Ok(())
}

#[tokio::test]
async fn concurrent_favorite_adds_keep_one_row() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let user = common::customer(&state).await?;
    let category = common::category(&state, &admin, "Drones", None).await?;
    let drone = common::product(&state, &admin, category.id, "Drone", 20_000_00, 3).await?;

    let request = || AddFavoriteRequest { product_id: drone.id };
    let (first, second, third) = tokio::join!(
        favorite_service::add_favorite(&state, &user, request()),
        favorite_service::add_favorite(&state, &user, request()),
        favorite_service::add_favorite(&state, &user, request()),
    );
    let ids = [first?, second?, third?].map(|resp| resp.data.expect("favorite").id);
    assert!(ids.iter().all(|id| *id == ids[0]));

    let favorites = favorite_service::list_favorites(&state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites")
        .items;
    assert_eq!(favorites.len(), 1);

    Ok(())
}
