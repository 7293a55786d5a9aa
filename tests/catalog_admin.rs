mod common;

use awe_store_api::{
    dto::products::{InventoryAdjustRequest, UpdateProductRequest},
    error::AppError,
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{admin_service, auth_service, product_service},
};

use common::{
    create_admin, create_product, product_request, register_customer, register_request, run_tag,
};

#[tokio::test]
async fn product_listing_filters_sorts_and_pages() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("catalog-admin-{run}@awe.example")).await?;
    let category = format!("Cat-{run}");
    let maker = format!("Maker-{run}");

    for (name, price, stock) in [("Speaker", 1_000, 4), ("Amplifier", 2_000, 0), ("Turntable", 3_000, 7)] {
        let mut request = product_request(&format!("{name} {run}"), price, stock);
        request.category = category.clone();
        request.manufacturer = Some(maker.clone());
        product_service::create_product(&state, &admin, request).await?;
    }

    let by_category = |query: ProductQuery| ProductQuery {
        category: Some(category.clone()),
        ..query
    };

    let cheapest_first = product_service::list_products(
        &state,
        by_category(ProductQuery {
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        }),
    )
    .await?;
    let prices: Vec<i64> = cheapest_first.data.unwrap().items.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![1_000, 2_000, 3_000]);
    assert_eq!(cheapest_first.meta.unwrap().total, Some(3));

    let priced = product_service::list_products(
        &state,
        by_category(ProductQuery {
            min_price: Some(1_500),
            max_price: Some(2_500),
            ..Default::default()
        }),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(priced.items.len(), 1);
    assert_eq!(priced.items[0].name, format!("Amplifier {run}"));

    let in_stock = product_service::list_products(
        &state,
        by_category(ProductQuery {
            in_stock_only: Some(true),
            ..Default::default()
        }),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(in_stock.items.len(), 2);
    assert!(in_stock.items.iter().all(|p| p.stock > 0));

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            q: Some(format!("turntable {run}")),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(searched.items.len(), 1);

    let second_page = product_service::list_products(
        &state,
        by_category(ProductQuery {
            page: Some(2),
            per_page: Some(2),
            sort_by: Some(ProductSortBy::Name),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        }),
    )
    .await?;
    let meta = second_page.meta.unwrap();
    assert_eq!((meta.page, meta.per_page, meta.total), (Some(2), Some(2), Some(3)));
    let items = second_page.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, format!("Turntable {run}"));

    let categories = product_service::list_categories(&state).await?.data.unwrap();
    assert!(categories.items.contains(&category));
    let makers = product_service::list_manufacturers(&state).await?.data.unwrap();
    assert!(makers.items.contains(&maker));
    Ok(())
}

#[tokio::test]
async fn product_updates_keep_names_unique() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("rename-admin-{run}@awe.example")).await?;
    let one = format!("Rename One {run}");
    create_product(&state, &admin, &one, 1_000, 1).await?;
    let two = create_product(&state, &admin, &format!("Rename Two {run}"), 1_000, 1).await?;

    assert!(matches!(
        product_service::update_product(
            &state,
            &admin,
            two,
            UpdateProductRequest {
                name: Some(format!("  {one} ")),
                ..Default::default()
            },
        )
        .await,
        Err(AppError::Conflict(_))
    ));

    // Keeping its own name is not a conflict.
    let updated = product_service::update_product(
        &state,
        &admin,
        two,
        UpdateProductRequest {
            name: Some(format!("Rename Two {run}")),
            price: Some(1_250),
            stock: Some(9),
            is_available: Some(false),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.price, 1_250);
    assert_eq!(updated.stock, 9);
    assert!(!updated.is_available);

    let (customer, _) =
        register_customer(&state, "Nosy", &format!("nosy-{run}@awe.example")).await?;
    assert!(matches!(
        product_service::update_product(&state, &customer, two, UpdateProductRequest::default())
            .await,
        Err(AppError::Forbidden)
    ));
    Ok(())
}

#[tokio::test]
async fn inventory_adjust_rejects_overflow() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("stock-admin-{run}@awe.example")).await?;
    let warehouse =
        create_product(&state, &admin, &format!("Warehouse Cable {run}"), 100, i32::MAX - 1).await?;

    let overflow = admin_service::adjust_inventory(
        &state,
        &admin,
        warehouse,
        InventoryAdjustRequest {
            delta: 10,
            reason: None,
        },
    )
    .await;
    assert!(matches!(overflow, Err(AppError::BadRequest(_))));

    let product = product_service::get_product(&state, warehouse).await?.data.unwrap();
    assert_eq!(product.stock, i32::MAX - 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_registration_reports_conflict() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let email = format!("twin-{}@awe.example", run_tag());

    let (first, second) = tokio::join!(
        auth_service::register_user(&state, register_request("Twin", "One", &email)),
        auth_service::register_user(&state, register_request("Twin", "Two", &email)),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_))))
    );
    Ok(())
}
