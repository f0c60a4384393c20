use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LikeExpr, Query};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    catalog,
    dto::products::{CreateProductRequest, ProductDetails, ProductList, UpdateProductRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        compare_items::{Column as CompareCol, Entity as CompareItems},
        favorites::{Column as FavCol, Entity as Favorites},
        product_attribute_values::{Column as ValueCol, Entity as ProductAttributeValues},
        product_images::{Column as ImageCol, Entity as ProductImages},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{attribute_service, category_service, image_service},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let option_ids = query.option_ids().map_err(AppError::BadRequest)?;
    let mut condition = Condition::all().add(Column::IsDeleted.eq(false));

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(LikeExpr::new(pattern.clone()).escape('\\')))
                .add(Expr::col(Column::Description).ilike(LikeExpr::new(pattern).escape('\\'))),
        );
    }

    if let Some(category_id) = query.category_id {
        category_service::find_live(&state.orm, category_id).await?;
        let links = category_service::load_links(&state.orm).await?;
        let subtree = catalog::descendants(&links, category_id);
        condition = condition.add(Column::CategoryId.is_in(subtree));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.in_stock == Some(true) {
        condition = condition.add(Column::Stock.gt(0));
    }

    if !option_ids.is_empty() {
        let tagged = Query::select()
            .column(ValueCol::ProductId)
            .from(ProductAttributeValues)
            .and_where(ValueCol::OptionId.is_in(option_ids))
            .to_owned();
        condition = condition.add(Column::Id.in_subquery(tagged));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    // Equal sort keys would otherwise shuffle rows between pages.
    finder = finder.order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_main_images(&state.orm, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetails>> {
    let model = find_live(&state.orm, id).await?;
    let category = category_service::find_live(&state.orm, model.category_id).await?;
    let images = image_service::list_for_product(&state.orm, id).await?;
    let attributes = attribute_service::load_product_attributes(&state.orm, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    let main_image = images.first().map(|i| i.url.clone());
    Ok(ApiResponse::success(
        "Product",
        ProductDetails {
            product: product_from_entity(model, main_image),
            category: category_service::category_from_entity(category),
            images,
            attributes,
        },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;
    ensure_category(&state.orm, payload.category_id).await?;
    ensure_slug_free(&state.orm, &payload.slug, None).await?;

    let slug = payload.slug.clone();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(payload.category_id),
        name: Set(payload.name),
        slug: Set(payload.slug),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        is_deleted: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique(e, format!("slug {slug} is already used")))?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, None),
        Some(Meta::empty()),
    ))
}

/// Moving a product to another category drops values of attributes the new
/// category does not carry.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;
    let txn = state.orm.begin().await?;
    let existing = find_live(&txn, id).await?;
    let old_category = existing.category_id;

    let mut active: ActiveModel = existing.into();
    if let Some(category_id) = payload.category_id.filter(|c| *c != old_category) {
        ensure_category(&txn, category_id).await?;
        let kept: Vec<Uuid> = attribute_service::effective_bindings(&txn, category_id)
            .await?
            .into_iter()
            .map(|b| b.attribute_id)
            .collect();
        let dropped = ProductAttributeValues::delete_many()
            .filter(ValueCol::ProductId.eq(id))
            .filter(ValueCol::AttributeId.is_not_in(kept))
            .exec(&txn)
            .await?;
        if dropped.rows_affected > 0 {
            tracing::debug!(product_id = %id, dropped = dropped.rows_affected, "dropped attribute values on category move");
        }
        active.category_id = Set(category_id);
    }
    if let Some(slug) = payload.slug {
        ensure_slug_free(&txn, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active
        .update(&txn)
        .await
        .map_err(|e| AppError::on_unique(e, "slug is already used"))?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let main_image = main_images(&state.orm, &[product.id]).await?.remove(&product.id);
    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product, main_image),
        Some(Meta::empty()),
    ))
}

/// Soft delete; the product also leaves every cart, favorite and compare list.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let existing = find_live(&txn, id).await?;

    let mut active: ActiveModel = existing.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    detach_from_lists(&txn, &[id]).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Deleted"))
}

/// Drops the products from every cart, favorite and compare list.
pub(crate) async fn detach_from_lists<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    CartItems::delete_many()
        .filter(CartCol::ProductId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    Favorites::delete_many()
        .filter(FavCol::ProductId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    CompareItems::delete_many()
        .filter(CompareCol::ProductId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(())
}

pub(crate) async fn find_live<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .filter(Column::IsDeleted.eq(false))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Like [`find_live`] but reports a missing product as a bad request, for
/// endpoints that take the product id in the body.
pub(crate) async fn require_live<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<ProductModel> {
    match find_live(conn, id).await {
        Err(AppError::NotFound) => Err(AppError::BadRequest("product not found".into())),
        other => other,
    }
}

/// Lowest-priority image of each product, as a public URL.
pub(crate) async fn main_images<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, String>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let images = ProductImages::find()
        .filter(ImageCol::ProductId.is_in(product_ids.to_vec()))
        .order_by_asc(ImageCol::Priority)
        .all(conn)
        .await?;

    let mut out = HashMap::new();
    for image in images {
        out.entry(image.product_id)
            .or_insert_with(|| image_service::public_url(&image.file_name));
    }
    Ok(out)
}

pub(crate) async fn with_main_images<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let ids: Vec<Uuid> = models.iter().map(|p| p.id).collect();
    let mut images = main_images(conn, &ids).await?;
    Ok(models
        .into_iter()
        .map(|model| {
            let image = images.remove(&model.id);
            product_from_entity(model, image)
        })
        .collect())
}

/// Live products for the given ids, keyed by id.
pub(crate) async fn load_live<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Product>> {
    let unique: Vec<Uuid> = ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }
    let models = Products::find()
        .filter(Column::Id.is_in(unique))
        .filter(Column::IsDeleted.eq(false))
        .all(conn)
        .await?;
    Ok(with_main_images(conn, models)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, category_id: Uuid) -> AppResult<()> {
    match category_service::find_live(conn, category_id).await {
        Ok(_) => Ok(()),
        Err(AppError::NotFound) => Err(AppError::BadRequest("category not found".into())),
        Err(err) => Err(err),
    }
}

async fn ensure_slug_free<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Products::find().filter(Column::Slug.eq(slug));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::Conflict(format!("slug {slug} is already used")));
    }
    Ok(())
}

pub(crate) fn product_from_entity(model: ProductModel, main_image: Option<String>) -> Product {
    Product {
        id: model.id,
        category_id: model.category_id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        price: model.price,
        stock: model.stock,
        main_image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Wraps a search term for `ILIKE`, treating `%` and `_` in it as literals.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
