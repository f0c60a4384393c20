use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::shipping::{CityList, CityQuery, WarehouseList, WarehouseQuery},
    error::AppResult,
    response::ApiResponse,
    services::shipping_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cities", get(search_cities))
        .route("/warehouses", get(list_warehouses))
}

#[utoipa::path(
    get,
    path = "/api/shipping/cities",
    params(CityQuery),
    responses(
        (status = 200, description = "Nova Poshta cities matching the query", body = ApiResponse<CityList>),
        (status = 400, description = "Empty query"),
        (status = 502, description = "Nova Poshta unavailable"),
    ),
    tag = "Shipping"
)]
pub async fn search_cities(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> AppResult<Json<ApiResponse<CityList>>> {
    let resp = shipping_service::cities(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shipping/warehouses",
    params(WarehouseQuery),
    responses(
        (status = 200, description = "Nova Poshta branches of a city", body = ApiResponse<WarehouseList>),
        (status = 400, description = "Missing city_ref"),
        (status = 502, description = "Nova Poshta unavailable"),
    ),
    tag = "Shipping"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<WarehouseQuery>,
) -> AppResult<Json<ApiResponse<WarehouseList>>> {
    let resp = shipping_service::warehouses(&state, query).await?;
    Ok(Json(resp))
}
