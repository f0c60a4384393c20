use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use sea_orm::sea_query::Query;
use uuid::Uuid;

use crate::{
    catalog,
    dto::compare::{AddCompareRequest, CompareGroup, CompareList, CompareRow},
    entity::{
        compare_items::{ActiveModel, Column, Entity as CompareItems, Model as CompareModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::{CompareItem, EffectiveAttribute, ProductAttribute},
    response::{ApiResponse, Meta},
    services::{attribute_service, category_service, product_service},
    state::AppState,
};

pub const MAX_PER_CATEGORY: u64 = 10;

/// Compared products grouped by category, each group with its comparison table.
pub async fn list_compare(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CompareList>> {
    let entries = CompareItems::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let ids: Vec<Uuid> = entries.iter().map(|e| e.product_id).collect();
    let mut products = product_service::load_live(&state.orm, &ids).await?;

    // Groups follow the order in which their first product was added.
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, Vec<_>> = HashMap::new();
    for entry in entries {
        let Some(product) = products.remove(&entry.product_id) else {
            continue;
        };
        let group = grouped.entry(product.category_id).or_insert_with(|| {
            order.push(product.category_id);
            Vec::new()
        });
        group.push(product);
    }

    let mut groups = Vec::with_capacity(order.len());
    for category_id in order {
        let Some(group_products) = grouped.remove(&category_id) else {
            continue;
        };
        let category = match category_service::find_live(&state.orm, category_id).await {
            Ok(category) => category,
            Err(AppError::NotFound) => continue,
            Err(err) => return Err(err),
        };
        let attributes = attribute_service::load_effective_attributes(&state.orm, category_id).await?;
        let product_ids: Vec<Uuid> = group_products.iter().map(|p| p.id).collect();
        let values = attribute_service::load_product_attributes(&state.orm, &product_ids).await?;

        groups.push(CompareGroup {
            category: category_service::category_from_entity(category),
            rows: comparison_rows(&attributes, &product_ids, &values),
            products: group_products,
        });
    }

    Ok(ApiResponse::success(
        "Compare list",
        CompareList { groups },
        Some(Meta::empty()),
    ))
}

/// Idempotent; a category holds at most [`MAX_PER_CATEGORY`] compared products.
pub async fn add_compare(
    state: &AppState,
    user: &AuthUser,
    payload: AddCompareRequest,
) -> AppResult<ApiResponse<CompareItem>> {
    let product = product_service::require_live(&state.orm, payload.product_id).await?;

    if let Some(item) = find_entry(state, user.user_id, product.id).await? {
        return Ok(already_compared(item));
    }

    let same_category = Query::select()
        .column(ProdCol::Id)
        .from(Products)
        .and_where(ProdCol::CategoryId.eq(product.category_id))
        .and_where(ProdCol::IsDeleted.eq(false))
        .to_owned();
    let in_category = CompareItems::find()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.in_subquery(same_category))
        .count(&state.orm)
        .await?;
    if in_category >= MAX_PER_CATEGORY {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_PER_CATEGORY} products of one category can be compared"
        )));
    }

    let inserted = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    match inserted {
        Ok(item) => Ok(ApiResponse::success(
            "Added to compare list",
            compare_from_entity(item),
            Some(Meta::empty()),
        )),
        Err(err) if is_unique_violation(&err) => find_entry(state, user.user_id, product.id)
            .await?
            .map(already_compared)
            .ok_or(AppError::OrmError(err)),
        Err(err) => Err(err.into()),
    }
}

async fn find_entry(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<CompareModel>> {
    Ok(CompareItems::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .one(&state.orm)
        .await?)
}

fn already_compared(item: CompareModel) -> ApiResponse<CompareItem> {
    ApiResponse::success(
        "Already in compare list",
        compare_from_entity(item),
        Some(Meta::empty()),
    )
}

pub async fn remove_compare(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let res = CompareItems::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::done("Removed"))
}

pub async fn clear_compare(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    CompareItems::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    Ok(ApiResponse::done("Compare list cleared"))
}

/// One row per attribute; `values[i]` is the rendered value of `product_ids[i]`.
pub fn comparison_rows(
    attributes: &[EffectiveAttribute],
    product_ids: &[Uuid],
    values: &HashMap<Uuid, Vec<ProductAttribute>>,
) -> Vec<CompareRow> {
    attributes
        .iter()
        .map(|effective| {
            let attribute_id = effective.attribute.id;
            let row_values = product_ids
                .iter()
                .map(|product_id| {
                    values
                        .get(product_id)?
                        .iter()
                        .find(|v| v.attribute_id == attribute_id)
                        .and_then(catalog::display_value)
                })
                .collect();
            CompareRow {
                attribute_id,
                name: effective.attribute.name.clone(),
                values: row_values,
            }
        })
        .collect()
}

fn compare_from_entity(model: CompareModel) -> CompareItem {
    CompareItem {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribute, AttributeType};

    fn effective(name: &str, data_type: AttributeType, unit: Option<&str>) -> EffectiveAttribute {
        EffectiveAttribute {
            attribute: Attribute {
                id: Uuid::new_v4(),
                name: name.into(),
                slug: name.to_lowercase(),
                data_type,
                unit: unit.map(Into::into),
                created_at: Utc::now(),
            },
            options: vec![],
            is_required: false,
            sort_order: 0,
            is_filterable: true,
            source_category_id: Uuid::new_v4(),
            inherited: false,
        }
    }

    fn number_value(attr: &EffectiveAttribute, n: f64) -> ProductAttribute {
        ProductAttribute {
            attribute_id: attr.attribute.id,
            name: attr.attribute.name.clone(),
            data_type: attr.attribute.data_type,
            unit: attr.attribute.unit.clone(),
            value_text: None,
            value_number: Some(n),
            value_bool: None,
            option_ids: vec![],
            options: vec![],
        }
    }

    #[test]
    fn rows_align_values_with_products() {
        let ram = effective("RAM", AttributeType::Number, Some("GB"));
        let color = effective("Color", AttributeType::Select, None);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut values = HashMap::new();
        values.insert(b, vec![number_value(&ram, 8.0)]);

        let rows = comparison_rows(&[ram.clone(), color], &[a, b], &values);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "RAM");
        assert_eq!(rows[0].values, vec![None, Some("8 GB".to_string())]);
        assert_eq!(rows[1].values, vec![None, None]);
    }
}
