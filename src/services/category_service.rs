use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    catalog::{self, CategoryLink},
    dto::categories::{CategoryList, CategoryTree, CreateCategoryRequest, UpdateCategoryRequest},
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CatCol, Entity as Categories, Model as CategoryModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
    services::product_service,
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = live_categories(&state.orm).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn category_tree(state: &AppState) -> AppResult<ApiResponse<CategoryTree>> {
    let categories = live_categories(&state.orm).await?;
    let items = catalog::build_tree(&categories);
    Ok(ApiResponse::success(
        "Category tree",
        CategoryTree { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = find_live(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Category",
        category_from_entity(category),
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    payload.validate()?;

    if let Some(parent_id) = payload.parent_id {
        find_live(&state.orm, parent_id)
            .await
            .map_err(parent_missing)?;
    }
    ensure_slug_free(&state.orm, &payload.slug, None).await?;

    let slug = payload.slug.clone();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        parent_id: Set(payload.parent_id),
        priority: Set(payload.priority),
        image: Set(payload.image),
        is_deleted: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique(e, format!("slug {slug} is already used")))?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = find_live(&state.orm, id).await?;

    if payload.make_root && payload.parent_id.is_some() {
        return Err(AppError::BadRequest(
            "parent_id and make_root cannot be combined".into(),
        ));
    }

    let mut active: CategoryActive = existing.into();

    if let Some(parent_id) = payload.parent_id {
        find_live(&state.orm, parent_id)
            .await
            .map_err(parent_missing)?;
        let links = catalog::index_links(&load_links(&state.orm).await?);
        if catalog::would_create_cycle(&links, id, parent_id) {
            return Err(AppError::BadRequest(
                "a category cannot be moved under itself or its descendants".into(),
            ));
        }
        active.parent_id = Set(Some(parent_id));
    } else if payload.make_root {
        active.parent_id = Set(None);
    }

    if let Some(slug) = payload.slug {
        ensure_slug_free(&state.orm, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority);
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }

    let category = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::on_unique(e, "slug is already used"))?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Soft-deletes the category, its subtree and the products filed under it.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    find_live(&txn, id).await?;

    let links = load_links(&txn).await?;
    let subtree = catalog::descendants(&links, id);

    Categories::update_many()
        .col_expr(CatCol::IsDeleted, Expr::value(true))
        .filter(CatCol::Id.is_in(subtree.clone()))
        .exec(&txn)
        .await?;

    let product_ids: Vec<Uuid> = Products::find()
        .select_only()
        .column(ProdCol::Id)
        .filter(ProdCol::CategoryId.is_in(subtree.clone()))
        .filter(ProdCol::IsDeleted.eq(false))
        .into_tuple()
        .all(&txn)
        .await?;

    Products::update_many()
        .col_expr(ProdCol::IsDeleted, Expr::value(true))
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .exec(&txn)
        .await?;
    product_service::detach_from_lists(&txn, &product_ids).await?;

    txn.commit().await?;

    tracing::info!(
        category_id = %id,
        categories = subtree.len(),
        products = product_ids.len(),
        "category subtree deleted"
    );

    audit::record(
        &state.pool,
        user.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id, "subtree": subtree }),
    )
    .await;

    Ok(ApiResponse::done("Deleted"))
}

fn parent_missing(err: AppError) -> AppError {
    match err {
        AppError::NotFound => AppError::BadRequest("parent category not found".into()),
        other => other,
    }
}

pub(crate) async fn find_live<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .filter(CatCol::IsDeleted.eq(false))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub(crate) async fn load_links<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<CategoryLink>> {
    Ok(Categories::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|c| CategoryLink {
            id: c.id,
            parent_id: c.parent_id,
            is_deleted: c.is_deleted,
        })
        .collect())
}

async fn live_categories<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<Category>> {
    Ok(Categories::find()
        .filter(CatCol::IsDeleted.eq(false))
        .order_by_asc(CatCol::Priority)
        .order_by_asc(CatCol::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect())
}

async fn ensure_slug_free<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Categories::find().filter(CatCol::Slug.eq(slug));
    if let Some(id) = except {
        finder = finder.filter(CatCol::Id.ne(id));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::Conflict(format!("slug {slug} is already used")));
    }
    Ok(())
}

pub(crate) fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
        priority: model.priority,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
