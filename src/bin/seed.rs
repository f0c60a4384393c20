use std::collections::HashMap;

use rozetka_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", ROLE_USER).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &DbPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &DbPool) -> anyhow::Result<()> {
    let electronics = upsert_category(pool, "Electronics", "electronics", None, 0).await?;
    let phones = upsert_category(pool, "Smartphones", "smartphones", Some(electronics), 0).await?;
    let laptops = upsert_category(pool, "Laptops", "laptops", Some(electronics), 1).await?;
    upsert_category(pool, "Clothing", "clothing", None, 1).await?;

    let brand = upsert_attribute(pool, "Brand", "brand", "select", None).await?;
    let ram = upsert_attribute(pool, "RAM", "ram", "number", Some("GB")).await?;
    let has_5g = upsert_attribute(pool, "5G", "5g", "boolean", None).await?;
    let screen = upsert_attribute(pool, "Screen size", "screen-size", "number", Some("in")).await?;
    let colors = upsert_attribute(pool, "Color", "color", "multi_select", None).await?;

    let mut options = HashMap::new();
    for (i, value) in ["Apple", "Samsung", "Lenovo"].into_iter().enumerate() {
        options.insert(value, upsert_option(pool, brand, value, i as i32).await?);
    }
    for (i, value) in ["Black", "Silver", "Blue"].into_iter().enumerate() {
        options.insert(value, upsert_option(pool, colors, value, i as i32).await?);
    }

    // Brand lives on the root and is inherited by every electronics subcategory.
    bind(pool, electronics, brand, true, 0).await?;
    bind(pool, electronics, colors, false, 90).await?;
    bind(pool, phones, ram, true, 10).await?;
    bind(pool, phones, has_5g, false, 20).await?;
    bind(pool, laptops, ram, true, 10).await?;
    bind(pool, laptops, screen, true, 20).await?;

    let iphone = upsert_product(pool, phones, "iPhone 15", "iphone-15", 3_999_900, 12).await?;
    set_option(pool, iphone, brand, options["Apple"]).await?;
    set_option(pool, iphone, colors, options["Black"]).await?;
    set_option(pool, iphone, colors, options["Blue"]).await?;
    set_number(pool, iphone, ram, 6.0).await?;
    set_bool(pool, iphone, has_5g, true).await?;

    let galaxy = upsert_product(pool, phones, "Galaxy S24", "galaxy-s24", 3_499_900, 3).await?;
    set_option(pool, galaxy, brand, options["Samsung"]).await?;
    set_option(pool, galaxy, colors, options["Silver"]).await?;
    set_number(pool, galaxy, ram, 8.0).await?;
    set_bool(pool, galaxy, has_5g, true).await?;

    let thinkpad = upsert_product(pool, laptops, "ThinkPad X1", "thinkpad-x1", 7_250_000, 5).await?;
    set_option(pool, thinkpad, brand, options["Lenovo"]).await?;
    set_option(pool, thinkpad, colors, options["Black"]).await?;
    set_number(pool, thinkpad, ram, 16.0).await?;
    set_number(pool, thinkpad, screen, 14.0).await?;

    println!("Seeded catalog");
    Ok(())
}

async fn upsert_category(
    pool: &DbPool,
    name: &str,
    slug: &str,
    parent_id: Option<Uuid>,
    priority: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug, parent_id, priority)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name, parent_id = EXCLUDED.parent_id, priority = EXCLUDED.priority
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(parent_id)
    .bind(priority)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_attribute(
    pool: &DbPool,
    name: &str,
    slug: &str,
    data_type: &str,
    unit: Option<&str>,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO attributes (id, name, slug, data_type, unit)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, unit = EXCLUDED.unit
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(data_type)
    .bind(unit)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_option(
    pool: &DbPool,
    attribute_id: Uuid,
    value: &str,
    sort_order: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO attribute_options (id, attribute_id, value, sort_order)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (attribute_id, value) DO UPDATE SET sort_order = EXCLUDED.sort_order
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(attribute_id)
    .bind(value)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn bind(
    pool: &DbPool,
    category_id: Uuid,
    attribute_id: Uuid,
    is_required: bool,
    sort_order: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO category_attributes (id, category_id, attribute_id, is_required, sort_order, is_filterable)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        ON CONFLICT (category_id, attribute_id) DO UPDATE
            SET is_required = EXCLUDED.is_required, sort_order = EXCLUDED.sort_order
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(attribute_id)
    .bind(is_required)
    .bind(sort_order)
    .execute(pool)
    .await?;
    Ok(())
}

/// Re-seeding resets the product's attribute values.
async fn upsert_product(
    pool: &DbPool,
    category_id: Uuid,
    name: &str,
    slug: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (id, category_id, name, slug, description, price, stock)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name, category_id = EXCLUDED.category_id,
                price = EXCLUDED.price, stock = EXCLUDED.stock, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(name)
    .bind(slug)
    .bind(format!("{name} from the demo catalog"))
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await?;

    sqlx::query("DELETE FROM product_attribute_values WHERE product_id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn set_option(pool: &DbPool, product_id: Uuid, attribute_id: Uuid, option_id: Uuid) -> anyhow::Result<()> {
    insert_value(pool, product_id, attribute_id, None, None, Some(option_id)).await
}

async fn set_number(pool: &DbPool, product_id: Uuid, attribute_id: Uuid, value: f64) -> anyhow::Result<()> {
    insert_value(pool, product_id, attribute_id, Some(value), None, None).await
}

async fn set_bool(pool: &DbPool, product_id: Uuid, attribute_id: Uuid, value: bool) -> anyhow::Result<()> {
    insert_value(pool, product_id, attribute_id, None, Some(value), None).await
}

async fn insert_value(
    pool: &DbPool,
    product_id: Uuid,
    attribute_id: Uuid,
    value_number: Option<f64>,
    value_bool: Option<bool>,
    option_id: Option<Uuid>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO product_attribute_values (id, product_id, attribute_id, value_number, value_bool, option_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(attribute_id)
    .bind(value_number)
    .bind(value_bool)
    .bind(option_id)
    .execute(pool)
    .await?;
    Ok(())
}
