mod common;

use awe_store_api::{
    dto::cart::{AddToCartRequest, MAX_LINE_QUANTITY, UpdateCartItemRequest},
    error::AppError,
    services::cart_service,
};
use uuid::Uuid;

use common::{create_admin, create_product, register_customer, run_tag};

fn add(product_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn cart_line_quantity_is_bounded() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("cart-admin-{run}@awe.example")).await?;
    let (customer, _) =
        register_customer(&state, "Bounded", &format!("bounded-{run}@awe.example")).await?;
    let bulk = create_product(&state, &admin, &format!("Bulk Resistor {run}"), 10, i32::MAX).await?;

    cart_service::add_to_cart(&state, &customer, add(bulk, MAX_LINE_QUANTITY)).await?;

    // Accumulating past the per-line cap is refused, however large the stock.
    assert!(matches!(
        cart_service::add_to_cart(&state, &customer, add(bulk, 1)).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        cart_service::add_to_cart(&state, &customer, add(bulk, i32::MAX)).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        cart_service::update_cart_item(
            &state,
            &customer,
            bulk,
            UpdateCartItemRequest {
                quantity: Some(i32::MAX),
                selected: None,
            },
        )
        .await,
        Err(AppError::BadRequest(_))
    ));

    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, MAX_LINE_QUANTITY);
    Ok(())
}

#[tokio::test]
async fn concurrent_first_adds_accumulate() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("race-admin-{run}@awe.example")).await?;
    let (customer, _) =
        register_customer(&state, "Racer", &format!("racer-{run}@awe.example")).await?;

    for round in 0..10 {
        let product =
            create_product(&state, &admin, &format!("Race Widget {run}-{round}"), 500, 10).await?;

        let (first, second) = tokio::join!(
            cart_service::add_to_cart(&state, &customer, add(product, 1)),
            cart_service::add_to_cart(&state, &customer, add(product, 1)),
        );
        first?;
        second?;

        let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
        let line = cart
            .items
            .iter()
            .find(|line| line.product_id == product)
            .expect("cart line");
        assert_eq!(line.quantity, 2, "round {round}");
    }
    Ok(())
}

#[tokio::test]
async fn remove_and_clear_cart_lines() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();
    let admin = create_admin(&state, &format!("clear-admin-{run}@awe.example")).await?;
    let (customer, _) =
        register_customer(&state, "Tidy", &format!("tidy-{run}@awe.example")).await?;
    let mouse = create_product(&state, &admin, &format!("Clear Mouse {run}"), 4_000, 10).await?;
    let pad = create_product(&state, &admin, &format!("Clear Pad {run}"), 1_000, 10).await?;

    cart_service::add_to_cart(&state, &customer, add(mouse, 1)).await?;
    cart_service::add_to_cart(&state, &customer, add(pad, 2)).await?;

    let view = cart_service::remove_from_cart(&state, &customer, mouse)
        .await?
        .data
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].product_id, pad);
    assert_eq!(view.totals.subtotal, 2_000);

    assert!(matches!(
        cart_service::remove_from_cart(&state, &customer, mouse).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        cart_service::update_cart_item(
            &state,
            &customer,
            mouse,
            UpdateCartItemRequest {
                quantity: Some(1),
                selected: None,
            },
        )
        .await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        cart_service::update_cart_item(&state, &customer, pad, UpdateCartItemRequest::default())
            .await,
        Err(AppError::BadRequest(_))
    ));

    let cleared = cart_service::clear_cart(&state, &customer).await?.data.unwrap();
    assert!(cleared.items.is_empty());
    assert_eq!(cleared.totals.item_count, 0);
    assert_eq!(cleared.totals.total, 0);
    Ok(())
}
