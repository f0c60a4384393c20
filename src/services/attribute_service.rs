use std::collections::{HashMap, HashSet, hash_map::Entry};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    catalog::{self, AttributeSpec, Binding, ResolvedBinding},
    dto::{
        attributes::{
            AttributeList, CreateAttributeRequest, CreateOptionRequest, ProductAttributeList,
            SetProductAttributesRequest, UpdateAttributeRequest,
        },
        categories::{BindAttributeRequest, EffectiveAttributeList},
    },
    entity::{
        attribute_options::{
            ActiveModel as OptionActive, Column as OptionCol, Entity as AttributeOptions,
            Model as OptionModel,
        },
        attributes::{ActiveModel as AttributeActive, Column as AttrCol, Entity as Attributes, Model as AttributeModel},
        category_attributes::{
            ActiveModel as BindingActive, Column as BindingCol, Entity as CategoryAttributes,
        },
        product_attribute_values::{
            ActiveModel as ValueActive, Column as ValueCol, Entity as ProductAttributeValues,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Attribute, AttributeOption, AttributeType, AttributeWithOptions, EffectiveAttribute, ProductAttribute},
    response::{ApiResponse, Meta},
    services::{category_service, product_service},
    state::AppState,
};

pub async fn list_attributes(state: &AppState) -> AppResult<ApiResponse<AttributeList>> {
    let items = Attributes::find()
        .order_by_asc(AttrCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(attribute_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Attributes",
        AttributeList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_attribute(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<AttributeWithOptions>> {
    let attribute = find_attribute(&state.orm, id).await?;
    let mut options = load_options(&state.orm, &[id]).await?;
    Ok(ApiResponse::success(
        "Attribute",
        AttributeWithOptions {
            attribute: attribute_from_entity(attribute)?,
            options: options.remove(&id).unwrap_or_default(),
        },
        None,
    ))
}

pub async fn create_attribute(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAttributeRequest,
) -> AppResult<ApiResponse<Attribute>> {
    ensure_admin(user)?;
    payload.validate()?;

    let taken = Attributes::find()
        .filter(AttrCol::Slug.eq(payload.slug.clone()))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!(
            "slug {} is already used",
            payload.slug
        )));
    }

    let slug = payload.slug.clone();
    let attribute = AttributeActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        data_type: Set(payload.data_type.as_str().to_string()),
        unit: Set(payload.unit),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique(e, format!("slug {slug} is already used")))?;

    audit::record(
        &state.pool,
        user.user_id,
        "attribute_create",
        "attributes",
        serde_json::json!({ "attribute_id": attribute.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Attribute created",
        attribute_from_entity(attribute)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_attribute(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAttributeRequest,
) -> AppResult<ApiResponse<Attribute>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = find_attribute(&state.orm, id).await?;
    let current_type = parse_type(&existing.data_type)?;

    let mut active: AttributeActive = existing.into();
    if let Some(data_type) = payload.data_type.filter(|t| *t != current_type) {
        let in_use = ProductAttributeValues::find()
            .filter(ValueCol::AttributeId.eq(id))
            .count(&state.orm)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict(
                "type cannot change while products carry values for this attribute".into(),
            ));
        }
        active.data_type = Set(data_type.as_str().to_string());
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(Some(unit).filter(|u| !u.is_empty()));
    }

    let attribute = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "attribute_update",
        "attributes",
        serde_json::json!({ "attribute_id": attribute.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        attribute_from_entity(attribute)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_attribute(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    find_attribute(&state.orm, id).await?;

    let bound = CategoryAttributes::find()
        .filter(BindingCol::AttributeId.eq(id))
        .count(&state.orm)
        .await?;
    if bound > 0 {
        return Err(AppError::Conflict(
            "attribute is still bound to categories".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    ProductAttributeValues::delete_many()
        .filter(ValueCol::AttributeId.eq(id))
        .exec(&txn)
        .await?;
    Attributes::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "attribute_delete",
        "attributes",
        serde_json::json!({ "attribute_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Deleted"))
}

pub async fn add_option(
    state: &AppState,
    user: &AuthUser,
    attribute_id: Uuid,
    payload: CreateOptionRequest,
) -> AppResult<ApiResponse<AttributeOption>> {
    ensure_admin(user)?;
    payload.validate()?;
    let attribute = find_attribute(&state.orm, attribute_id).await?;
    if !parse_type(&attribute.data_type)?.has_options() {
        return Err(AppError::BadRequest(format!(
            "attribute {} does not take options",
            attribute.name
        )));
    }

    let value = payload.value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::BadRequest("option value cannot be blank".into()));
    }
    let duplicate = AttributeOptions::find()
        .filter(OptionCol::AttributeId.eq(attribute_id))
        .filter(OptionCol::Value.eq(value.clone()))
        .one(&state.orm)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict(format!("option {value} already exists")));
    }

    let option = OptionActive {
        id: Set(Uuid::new_v4()),
        attribute_id: Set(attribute_id),
        value: Set(value.clone()),
        sort_order: Set(payload.sort_order),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique(e, format!("option {value} already exists")))?;

    Ok(ApiResponse::success(
        "Option created",
        option_from_entity(option),
        Some(Meta::empty()),
    ))
}

pub async fn delete_option(
    state: &AppState,
    user: &AuthUser,
    option_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    AttributeOptions::find_by_id(option_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let used = ProductAttributeValues::find()
        .filter(ValueCol::OptionId.eq(option_id))
        .count(&state.orm)
        .await?;
    if used > 0 {
        return Err(AppError::Conflict("option is used by products".into()));
    }

    AttributeOptions::delete_by_id(option_id)
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::done("Deleted"))
}

/// Binding the same attribute again updates its override fields.
pub async fn bind_attribute(
    state: &AppState,
    user: &AuthUser,
    category_id: Uuid,
    attribute_id: Uuid,
    payload: BindAttributeRequest,
) -> AppResult<ApiResponse<EffectiveAttributeList>> {
    ensure_admin(user)?;
    category_service::find_live(&state.orm, category_id).await?;
    find_attribute(&state.orm, attribute_id).await?;

    let existing = CategoryAttributes::find()
        .filter(BindingCol::CategoryId.eq(category_id))
        .filter(BindingCol::AttributeId.eq(attribute_id))
        .one(&state.orm)
        .await?;

    match existing {
        Some(binding) => {
            let mut active: BindingActive = binding.into();
            active.is_required = Set(payload.is_required);
            active.sort_order = Set(payload.sort_order);
            active.is_filterable = Set(payload.is_filterable);
            active.update(&state.orm).await?;
        }
        None => {
            BindingActive {
                id: Set(Uuid::new_v4()),
                category_id: Set(category_id),
                attribute_id: Set(attribute_id),
                is_required: Set(payload.is_required),
                sort_order: Set(payload.sort_order),
                is_filterable: Set(payload.is_filterable),
            }
            .insert(&state.orm)
            .await
            .map_err(|e| AppError::on_unique(e, "attribute was bound concurrently, retry"))?;
        }
    }

    audit::record(
        &state.pool,
        user.user_id,
        "attribute_bind",
        "category_attributes",
        serde_json::json!({ "category_id": category_id, "attribute_id": attribute_id }),
    )
    .await;

    effective_attributes(state, category_id).await
}

pub async fn unbind_attribute(
    state: &AppState,
    user: &AuthUser,
    category_id: Uuid,
    attribute_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = CategoryAttributes::delete_many()
        .filter(BindingCol::CategoryId.eq(category_id))
        .filter(BindingCol::AttributeId.eq(attribute_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "attribute_unbind",
        "category_attributes",
        serde_json::json!({ "category_id": category_id, "attribute_id": attribute_id }),
    )
    .await;

    Ok(ApiResponse::done("Unbound"))
}

pub async fn effective_attributes(
    state: &AppState,
    category_id: Uuid,
) -> AppResult<ApiResponse<EffectiveAttributeList>> {
    let items = load_effective_attributes(&state.orm, category_id).await?;
    Ok(ApiResponse::success(
        "Category attributes",
        EffectiveAttributeList { items },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn load_effective_attributes<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> AppResult<Vec<EffectiveAttribute>> {
    let bindings = effective_bindings(conn, category_id).await?;
    let ids: Vec<Uuid> = bindings.iter().map(|b| b.attribute_id).collect();

    let mut attributes: HashMap<Uuid, AttributeModel> = Attributes::find()
        .filter(AttrCol::Id.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let mut options = load_options(conn, &ids).await?;

    bindings
        .into_iter()
        .filter_map(|binding| {
            let attribute = attributes.remove(&binding.attribute_id)?;
            Some((binding, attribute))
        })
        .map(|(binding, attribute)| {
            Ok(EffectiveAttribute {
                options: options.remove(&attribute.id).unwrap_or_default(),
                attribute: attribute_from_entity(attribute)?,
                is_required: binding.is_required,
                sort_order: binding.sort_order,
                is_filterable: binding.is_filterable,
                source_category_id: binding.source_category_id,
                inherited: binding.inherited,
            })
        })
        .collect()
}

/// Bindings in force for `category_id`, walking up through its parents.
pub(crate) async fn effective_bindings<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> AppResult<Vec<ResolvedBinding>> {
    let links = catalog::index_links(&category_service::load_links(conn).await?);
    let chain = catalog::ancestor_chain(&links, category_id);
    if chain.is_empty() {
        return Err(AppError::NotFound);
    }

    let bindings: Vec<Binding> = CategoryAttributes::find()
        .filter(BindingCol::CategoryId.is_in(chain.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|b| Binding {
            category_id: b.category_id,
            attribute_id: b.attribute_id,
            is_required: b.is_required,
            sort_order: b.sort_order,
            is_filterable: b.is_filterable,
        })
        .collect();

    Ok(catalog::resolve_inherited_bindings(&chain, &bindings))
}

pub async fn set_product_values(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SetProductAttributesRequest,
) -> AppResult<ApiResponse<ProductAttributeList>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let product = product_service::find_live(&txn, product_id).await?;
    let bindings = effective_bindings(&txn, product.category_id).await?;

    let mut ids: HashSet<Uuid> = bindings.iter().map(|b| b.attribute_id).collect();
    ids.extend(payload.values.iter().map(|v| v.attribute_id));
    let ids: Vec<Uuid> = ids.into_iter().collect();

    let mut option_ids = load_options(&txn, &ids).await?;
    let specs: HashMap<Uuid, AttributeSpec> = Attributes::find()
        .filter(AttrCol::Id.is_in(ids.clone()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|a| {
            let data_type = parse_type(&a.data_type)?;
            let options = option_ids
                .remove(&a.id)
                .unwrap_or_default()
                .into_iter()
                .map(|o| o.id)
                .collect();
            Ok((
                a.id,
                AttributeSpec {
                    id: a.id,
                    name: a.name,
                    data_type,
                    option_ids: options,
                },
            ))
        })
        .collect::<AppResult<_>>()?;

    let rows = catalog::validate_product_values(&bindings, &specs, &payload.values)
        .map_err(AppError::BadRequest)?;

    ProductAttributeValues::delete_many()
        .filter(ValueCol::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    for row in rows {
        ValueActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            attribute_id: Set(row.attribute_id),
            value_text: Set(row.value_text),
            value_number: Set(row.value_number),
            value_bool: Set(row.value_bool),
            option_id: Set(row.option_id),
        }
        .insert(&txn)
        .await?;
    }

    let items = load_product_attributes(&txn, &[product_id])
        .await?
        .remove(&product_id)
        .unwrap_or_default();
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_attributes_set",
        "product_attribute_values",
        serde_json::json!({ "product_id": product_id, "count": items.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Attributes saved",
        ProductAttributeList { items },
        Some(Meta::empty()),
    ))
}

pub async fn product_values(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<ProductAttributeList>> {
    product_service::find_live(&state.orm, product_id).await?;
    let items = load_product_attributes(&state.orm, &[product_id])
        .await?
        .remove(&product_id)
        .unwrap_or_default();
    Ok(ApiResponse::success(
        "Product attributes",
        ProductAttributeList { items },
        Some(Meta::empty()),
    ))
}

/// Values of several products, one entry per attribute, sorted by name.
pub(crate) async fn load_product_attributes<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<ProductAttribute>>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let values = ProductAttributeValues::find()
        .filter(ValueCol::ProductId.is_in(product_ids.to_vec()))
        .all(conn)
        .await?;

    let attribute_ids: Vec<Uuid> = values
        .iter()
        .map(|v| v.attribute_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let attributes: HashMap<Uuid, AttributeModel> = Attributes::find()
        .filter(AttrCol::Id.is_in(attribute_ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let option_values: HashMap<Uuid, AttributeOption> = load_options(conn, &attribute_ids)
        .await?
        .into_values()
        .flatten()
        .map(|o| (o.id, o))
        .collect();

    let mut grouped: HashMap<(Uuid, Uuid), ProductAttribute> = HashMap::new();
    for value in values {
        let Some(attribute) = attributes.get(&value.attribute_id) else {
            continue;
        };
        let entry = match grouped.entry((value.product_id, value.attribute_id)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(ProductAttribute {
                attribute_id: attribute.id,
                name: attribute.name.clone(),
                data_type: parse_type(&attribute.data_type)?,
                unit: attribute.unit.clone(),
                value_text: None,
                value_number: None,
                value_bool: None,
                option_ids: Vec::new(),
                options: Vec::new(),
            }),
        };

        if value.value_text.is_some() {
            entry.value_text = value.value_text;
        }
        if value.value_number.is_some() {
            entry.value_number = value.value_number;
        }
        if value.value_bool.is_some() {
            entry.value_bool = value.value_bool;
        }
        if let Some(option) = value.option_id.and_then(|id| option_values.get(&id)) {
            entry.option_ids.push(option.id);
            entry.options.push(option.value.clone());
        }
    }

    let mut out: HashMap<Uuid, Vec<ProductAttribute>> = HashMap::new();
    for ((product_id, _), attribute) in grouped {
        out.entry(product_id).or_default().push(attribute);
    }
    for list in out.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(out)
}

async fn find_attribute<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<AttributeModel> {
    Attributes::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Options per attribute, ordered by `sort_order` then value.
async fn load_options<C: ConnectionTrait>(
    conn: &C,
    attribute_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<AttributeOption>>> {
    if attribute_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut out: HashMap<Uuid, Vec<AttributeOption>> = HashMap::new();
    for option in AttributeOptions::find()
        .filter(OptionCol::AttributeId.is_in(attribute_ids.to_vec()))
        .order_by_asc(OptionCol::SortOrder)
        .order_by_asc(OptionCol::Value)
        .all(conn)
        .await?
    {
        out.entry(option.attribute_id)
            .or_default()
            .push(option_from_entity(option));
    }
    Ok(out)
}

fn parse_type(raw: &str) -> AppResult<AttributeType> {
    raw.parse::<AttributeType>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

pub(crate) fn attribute_from_entity(model: AttributeModel) -> AppResult<Attribute> {
    Ok(Attribute {
        id: model.id,
        data_type: parse_type(&model.data_type)?,
        name: model.name,
        slug: model.slug,
        unit: model.unit,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn option_from_entity(model: OptionModel) -> AttributeOption {
    AttributeOption {
        id: model.id,
        attribute_id: model.attribute_id,
        value: model.value,
        sort_order: model.sort_order,
    }
}
