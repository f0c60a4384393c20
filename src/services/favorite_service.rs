use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Query;
use uuid::Uuid;

use crate::{
    dto::favorites::{AddFavoriteRequest, FavoriteProductList},
    entity::{
        favorites::{ActiveModel, Column, Entity as Favorites, Model as FavoriteModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::Favorite,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service,
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavoriteProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let favorited = Query::select()
        .column(Column::ProductId)
        .from(Favorites)
        .and_where(Column::UserId.eq(user.user_id))
        .to_owned();

    let finder = Products::find()
        .filter(ProdCol::IsDeleted.eq(false))
        .filter(ProdCol::Id.in_subquery(favorited))
        .order_by_asc(ProdCol::Name)
        .order_by_asc(ProdCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = product_service::with_main_images(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Favorites",
        FavoriteProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Adding a product twice returns the existing favorite.
pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<Favorite>> {
    product_service::require_live(&state.orm, payload.product_id).await?;

    if let Some(favorite) = find_favorite(state, user.user_id, payload.product_id).await? {
        return Ok(already_favorite(favorite));
    }

    let inserted = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    match inserted {
        Ok(favorite) => Ok(ApiResponse::success(
            "Added to favorites",
            favorite_from_entity(favorite),
            Some(Meta::empty()),
        )),
        // A concurrent request for the same product won the insert.
        Err(err) if is_unique_violation(&err) => find_favorite(state, user.user_id, payload.product_id)
            .await?
            .map(already_favorite)
            .ok_or(AppError::OrmError(err)),
        Err(err) => Err(err.into()),
    }
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let res = Favorites::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::done("Removed"))
}

async fn find_favorite(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<FavoriteModel>> {
    Ok(Favorites::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .one(&state.orm)
        .await?)
}

fn already_favorite(favorite: FavoriteModel) -> ApiResponse<Favorite> {
    ApiResponse::success(
        "Already in favorites",
        favorite_from_entity(favorite),
        Some(Meta::empty()),
    )
}

fn favorite_from_entity(model: FavoriteModel) -> Favorite {
    Favorite {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
