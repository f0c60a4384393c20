mod common;

use rozetka_api::{
    dto::{
        attributes::{AttributeValueInput, CreateOptionRequest, SetProductAttributesRequest},
        categories::UpdateCategoryRequest,
        products::UpdateProductRequest,
    },
    error::AppError,
    models::{AttributeType, Product},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{attribute_service, category_service, product_service},
    state::AppState,
};
use uuid::Uuid;

async fn listed(state: &AppState, query: ProductQuery) -> anyhow::Result<Vec<Product>> {
    Ok(product_service::list_products(state, query)
        .await?
        .data
        .expect("products")
        .items)
}

fn names(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

fn value(attribute_id: Uuid) -> AttributeValueInput {
    AttributeValueInput {
        attribute_id,
        value_text: None,
        value_number: None,
        value_bool: None,
        option_ids: vec![],
    }
}

#[tokio::test]
async fn subcategories_inherit_parent_attributes() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;

    let root = common::category(&state, &admin, "Electronics", None).await?;
    let phones = common::category(&state, &admin, "Phones", Some(root.id)).await?;
    let brand = common::attribute(&state, &admin, "Brand", AttributeType::Select, None).await?;
    let ram = common::attribute(&state, &admin, "RAM", AttributeType::Number, Some("GB")).await?;

    common::bind(&state, &admin, root.id, brand.id, false, 5).await?;
    common::bind(&state, &admin, phones.id, ram.id, true, 1).await?;

    let effective = attribute_service::effective_attributes(&state, phones.id)
        .await?
        .data
        .expect("effective")
        .items;
    assert_eq!(effective.len(), 2);
    assert_eq!(effective[0].attribute.id, ram.id);
    assert!(!effective[0].inherited);
    assert_eq!(effective[1].attribute.id, brand.id);
    assert!(effective[1].inherited);
    assert_eq!(effective[1].source_category_id, root.id);

    // The child's own binding overrides the inherited one.
    common::bind(&state, &admin, phones.id, brand.id, true, 0).await?;
    let effective = attribute_service::effective_attributes(&state, phones.id)
        .await?
        .data
        .expect("effective")
        .items;
    let brand_binding = effective
        .iter()
        .find(|e| e.attribute.id == brand.id)
        .expect("brand binding");
    assert!(brand_binding.is_required);
    assert!(!brand_binding.inherited);
    assert_eq!(brand_binding.source_category_id, phones.id);

    Ok(())
}

#[tokio::test]
async fn category_cannot_move_under_its_descendant() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;

    let root = common::category(&state, &admin, "Home", None).await?;
    let child = common::category(&state, &admin, "Kitchen", Some(root.id)).await?;

    let err = category_service::update_category(
        &state,
        &admin,
        root.id,
        UpdateCategoryRequest {
            parent_id: Some(child.id),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let moved = category_service::update_category(
        &state,
        &admin,
        child.id,
        UpdateCategoryRequest {
            make_root: true,
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("category");
    assert_eq!(moved.parent_id, None);

    Ok(())
}

#[tokio::test]
async fn product_values_are_validated_and_filterable() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;

    let phones = common::category(&state, &admin, "Phones", None).await?;
    let brand = common::attribute(&state, &admin, "Brand", AttributeType::Select, None).await?;
    let ram = common::attribute(&state, &admin, "RAM", AttributeType::Number, Some("GB")).await?;
    let apple = common::option(&state, &admin, brand.id, "Apple").await?;
    let samsung = common::option(&state, &admin, brand.id, "Samsung").await?;
    common::bind(&state, &admin, phones.id, brand.id, true, 0).await?;
    common::bind(&state, &admin, phones.id, ram.id, false, 1).await?;

    let iphone = common::product(&state, &admin, phones.id, "iPhone", 40_000_00, 5).await?;
    let galaxy = common::product(&state, &admin, phones.id, "Galaxy", 35_000_00, 5).await?;

    // Missing required attribute.
    let err = attribute_service::set_product_values(
        &state,
        &admin,
        iphone.id,
        SetProductAttributesRequest {
            values: vec![AttributeValueInput {
                value_number: Some(6.0),
                ..value(ram.id)
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Option that belongs to no attribute of the product.
    let err = attribute_service::set_product_values(
        &state,
        &admin,
        iphone.id,
        SetProductAttributesRequest {
            values: vec![AttributeValueInput {
                option_ids: vec![Uuid::new_v4()],
                ..value(brand.id)
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let saved = attribute_service::set_product_values(
        &state,
        &admin,
        iphone.id,
        SetProductAttributesRequest {
            values: vec![
                AttributeValueInput {
                    option_ids: vec![apple.id],
                    ..value(brand.id)
                },
                AttributeValueInput {
                    value_number: Some(6.0),
                    ..value(ram.id)
                },
            ],
        },
    )
    .await?
    .data
    .expect("values")
    .items;
    assert_eq!(saved.len(), 2);

    attribute_service::set_product_values(
        &state,
        &admin,
        galaxy.id,
        SetProductAttributesRequest {
            values: vec![AttributeValueInput {
                option_ids: vec![samsung.id],
                ..value(brand.id)
            }],
        },
    )
    .await?;

    let filtered = product_service::list_products(
        &state,
        ProductQuery {
            category_id: Some(phones.id),
            options: Some(apple.id.to_string()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products")
    .items;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, iphone.id);

    let details = product_service::get_product(&state, iphone.id)
        .await?
        .data
        .expect("details");
    let brand_value = details
        .attributes
        .iter()
        .find(|a| a.attribute_id == brand.id)
        .expect("brand value");
    assert_eq!(brand_value.options, vec!["Apple".to_string()]);

    Ok(())
}

#[tokio::test]
async fn moving_a_product_drops_foreign_attribute_values() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;

    let phones = common::category(&state, &admin, "Phones", None).await?;
    let cases = common::category(&state, &admin, "Cases", None).await?;
    let ram = common::attribute(&state, &admin, "RAM", AttributeType::Number, Some("GB")).await?;
    let material = common::attribute(&state, &admin, "Material", AttributeType::Text, None).await?;
    common::bind(&state, &admin, phones.id, ram.id, false, 0).await?;
    common::bind(&state, &admin, phones.id, material.id, false, 1).await?;
    common::bind(&state, &admin, cases.id, material.id, false, 0).await?;

    let item = common::product(&state, &admin, phones.id, "Rugged", 9_999_00, 3).await?;
    attribute_service::set_product_values(
        &state,
        &admin,
        item.id,
        SetProductAttributesRequest {
            values: vec![
                AttributeValueInput {
                    value_number: Some(4.0),
                    ..value(ram.id)
                },
                AttributeValueInput {
                    value_text: Some("Aluminium".into()),
                    ..value(material.id)
                },
            ],
        },
    )
    .await?;

    product_service::update_product(
        &state,
        &admin,
        item.id,
        UpdateProductRequest {
            category_id: Some(cases.id),
            ..Default::default()
        },
    )
    .await?;

    let values = attribute_service::product_values(&state, item.id)
        .await?
        .data
        .expect("values")
        .items;
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].attribute_id, material.id);
    assert_eq!(values[0].value_text.as_deref(), Some("Aluminium"));

    Ok(())
}

#[tokio::test]
async fn deleting_a_category_hides_its_subtree_and_products() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;

    let root = common::category(&state, &admin, "Garden", None).await?;
    let child = common::category(&state, &admin, "Tools", Some(root.id)).await?;
    let shovel = common::product(&state, &admin, child.id, "Shovel", 500_00, 10).await?;

    category_service::delete_category(&state, &admin, root.id).await?;

    assert!(matches!(
        category_service::get_category(&state, child.id).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        product_service::get_product(&state, shovel.id).await,
        Err(AppError::NotFound)
    ));

    let tree = category_service::category_tree(&state)
        .await?
        .data
        .expect("tree")
        .items;
    assert!(tree.iter().all(|node| node.id != root.id));

    Ok(())
}

#[tokio::test]
async fn catalog_writes_require_admin() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let customer = common::customer(&state).await?;

    let err = common::category(&state, &customer, "Nope", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Forbidden)
    ));
    Ok(())
}

#[tokio::test]
async fn listing_filters_by_text_price_and_stock() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let lighting = common::category(&state, &admin, "Lighting", None).await?;
    common::product(&state, &admin, lighting.id, "LED lamp 100%", 500_00, 4).await?;
    common::product(&state, &admin, lighting.id, "Desk lamp", 1_500_00, 0).await?;
    common::product(&state, &admin, lighting.id, "Floor light", 3_000_00, 2).await?;
    let in_lighting = || ProductQuery {
        category_id: Some(lighting.id),
        ..Default::default()
    };

    let found = listed(
        &state,
        ProductQuery {
            q: Some("  LAMP ".into()),
            sort_by: Some(ProductSortBy::Name),
            sort_order: Some(SortOrder::Asc),
            ..in_lighting()
        },
    )
    .await?;
    assert_eq!(names(&found), vec!["Desk lamp", "LED lamp 100%"]);

    // Wildcards in the search text match only themselves.
    let found = listed(
        &state,
        ProductQuery {
            q: Some("%".into()),
            ..in_lighting()
        },
    )
    .await?;
    assert_eq!(names(&found), vec!["LED lamp 100%"]);
    let found = listed(
        &state,
        ProductQuery {
            q: Some("_".into()),
            ..in_lighting()
        },
    )
    .await?;
    assert!(found.is_empty());

    let found = listed(
        &state,
        ProductQuery {
            min_price: Some(1_000_00),
            max_price: Some(2_000_00),
            ..in_lighting()
        },
    )
    .await?;
    assert_eq!(names(&found), vec!["Desk lamp"]);

    let found = listed(
        &state,
        ProductQuery {
            in_stock: Some(true),
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Desc),
            ..in_lighting()
        },
    )
    .await?;
    assert_eq!(names(&found), vec!["Floor light", "LED lamp 100%"]);

    let found = listed(
        &state,
        ProductQuery {
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            per_page: Some(2),
            page: Some(2),
            ..in_lighting()
        },
    )
    .await?;
    assert_eq!(names(&found), vec!["Floor light"]);

    Ok(())
}

#[tokio::test]
async fn blank_option_values_are_rejected() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let color = common::attribute(&state, &admin, "Color", AttributeType::Select, None).await?;

    let err = attribute_service::add_option(
        &state,
        &admin,
        color.id,
        CreateOptionRequest {
            value: "   ".into(),
            sort_order: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let red = common::option(&state, &admin, color.id, "  Red ").await?;
    assert_eq!(red.value, "Red");
    let err = common::option(&state, &admin, color.id, "Red").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Conflict(_))
    ));

    Ok(())
}

#[tokio::test]
async fn equal_sort_keys_page_without_overlap() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let cables = common::category(&state, &admin, "Cables", None).await?;
    for n in 0..5 {
        common::product(&state, &admin, cables.id, &format!("Cable {n}"), 199_00, 10).await?;
    }

    let mut seen = std::collections::HashSet::new();
    for page in 1..=3 {
        let found = listed(
            &state,
            ProductQuery {
                category_id: Some(cables.id),
                sort_by: Some(ProductSortBy::Price),
                sort_order: Some(SortOrder::Asc),
                page: Some(page),
                per_page: Some(2),
                ..Default::default()
            },
        )
        .await?;
        seen.extend(found.into_iter().map(|p| p.id));
    }
    assert_eq!(seen.len(), 5);

    Ok(())
}
