mod common;

use awe_store_api::{
    dto::{
        auth::LoginRequest,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::UpdateOrderStatusRequest,
        products::InventoryAdjustRequest,
        tracking::AddTrackingEventRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    pricing::PricingPolicy,
    routes::params::LowStockQuery,
    services::{
        admin_service, auth_service, cart_service, customer_service, order_service,
        product_service, tracking_service,
    },
    status::{OrderStatus, TrackingEventType},
};

use common::{checkout_request, create_admin, create_product, register_request, run_tag};

// Customer registers, fills the cart, checks out and pays; admin ships the
// order, manages stock and finally deactivates the customer.
#[tokio::test]
async fn storefront_checkout_to_delivery_flow() -> anyhow::Result<()> {
    let Some(state) = common::test_state().await? else {
        return Ok(());
    };
    let run = run_tag();

    let admin = create_admin(&state, &format!("admin-{run}@awe.example")).await?;

    let email = format!("shopper-{run}@awe.example");
    let tokens = auth_service::register_user(&state, register_request("Sam", "Shopper", &email))
        .await?
        .data
        .unwrap();
    let customer = AuthUser {
        user_id: tokens.user.id,
        role: tokens.user.role.clone(),
    };

    let duplicate = auth_service::register_user(
        &state,
        register_request("Sam", "Again", &email.to_uppercase()),
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let laptop = create_product(&state, &admin, &format!("AAA Flow Laptop {run}"), 25_000, 5).await?;
    let cable = create_product(&state, &admin, &format!("AAA Flow Cable {run}"), 1_500, 50).await?;

    // Adding the same product twice accumulates quantity.
    for quantity in [2, 1] {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: laptop,
                quantity,
            },
        )
        .await?;
    }
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: cable,
            quantity: 2,
        },
    )
    .await?;
    cart_service::update_cart_item(
        &state,
        &customer,
        cable,
        UpdateCartItemRequest {
            quantity: None,
            selected: Some(false),
        },
    )
    .await?;

    let too_many = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: laptop,
            quantity: 3,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    let totals = cart_service::cart_summary(&state, &customer).await?.data.unwrap();
    assert_eq!(totals.item_count, 3);
    assert_eq!(totals.subtotal, 75_000);
    assert_eq!(totals.tax, 6_000);
    assert_eq!(totals.shipping, 0);
    assert_eq!(totals.total, 81_000);

    let placed = order_service::checkout(&state, &customer, checkout_request())
        .await?
        .data
        .unwrap();
    let order = placed.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.order_number.starts_with("AWE"));
    assert_eq!(order.total_amount, 81_000);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 3);

    // The deselected cable stays in the cart.
    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, cable);

    let product = product_service::get_product(&state, laptop).await?.data.unwrap();
    assert_eq!(product.stock, 2);
    assert_eq!(product.sales_count, 3);

    let tracking = tracking_service::get_for_order(&state, &customer, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(tracking.current_status, TrackingEventType::OrderCreated);
    assert_eq!(tracking.progress_percentage, 10);
    assert_eq!(tracking.events.len(), 1);

    let paid = order_service::pay_order(&state, &customer, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert!(paid.order.paid_at.is_some());
    assert!(matches!(
        order_service::pay_order(&state, &customer, order.id).await,
        Err(AppError::BadRequest(_))
    ));

    // Paid orders cannot jump straight to shipped.
    let skipped = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        status_change(OrderStatus::Shipped, None),
    )
    .await;
    assert!(matches!(skipped, Err(AppError::BadRequest(_))));

    admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        status_change(OrderStatus::Processing, None),
    )
    .await?;
    let tracking_number = format!("TRK{run}");
    let shipped = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        status_change(OrderStatus::Shipped, Some(tracking_number.clone())),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.order.status, OrderStatus::Shipped);
    assert!(shipped.order.shipped_at.is_some());
    assert_eq!(shipped.order.tracking_number.as_deref(), Some(tracking_number.as_str()));

    // Shipped orders are out of the customer's hands.
    assert!(matches!(
        order_service::cancel_order(&state, &customer, order.id).await,
        Err(AppError::BadRequest(_))
    ));

    let public = tracking_service::get_by_tracking_number(&state, &tracking_number)
        .await?
        .data
        .unwrap();
    assert_eq!(public.current_status, TrackingEventType::Shipped);
    assert_eq!(public.progress_percentage, 60);
    assert_eq!(public.events.len(), 4);

    let estimate = tracking_service::estimate(&state, &order.order_number)
        .await?
        .data
        .unwrap();
    assert_eq!(estimate.estimated_days, 2);
    assert_eq!(estimate.shipping_method, "expedited");

    tracking_service::add_event(
        &state,
        &admin,
        order.id,
        AddTrackingEventRequest {
            event_type: TrackingEventType::InTransit,
            description: None,
            location: Some("Sydney sorting facility".into()),
            operator: None,
            tracking_number: None,
        },
    )
    .await?;
    let summary = tracking_service::summary(&state, &customer).await?.data.unwrap();
    assert_eq!(summary.items[0].order_number, order.order_number);
    assert_eq!(summary.items[0].current_status, TrackingEventType::InTransit);
    assert_eq!(summary.items[0].progress_percentage, 80);

    let delivered = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        status_change(OrderStatus::Delivered, None),
    )
    .await?
    .data
    .unwrap();
    assert!(delivered.order.delivered_at.is_some());
    assert!(matches!(
        tracking_service::estimate(&state, &order.order_number).await,
        Err(AppError::BadRequest(_))
    ));

    // Low stock: 2 laptops left.
    let low = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(100),
            threshold: Some(2),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(low.items.iter().any(|p| p.id == laptop));
    assert!(low.items.iter().all(|p| p.stock <= 2));

    let negative = admin_service::adjust_inventory(
        &state,
        &admin,
        laptop,
        InventoryAdjustRequest {
            delta: -3,
            reason: None,
        },
    )
    .await;
    assert!(matches!(negative, Err(AppError::BadRequest(_))));
    let restocked = admin_service::adjust_inventory(
        &state,
        &admin,
        laptop,
        InventoryAdjustRequest {
            delta: 10,
            reason: Some("supplier delivery".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(restocked.stock, 12);

    // A second order from the cable line, cancelled before payment, returns its stock.
    cart_service::update_cart_item(
        &state,
        &customer,
        cable,
        UpdateCartItemRequest {
            quantity: None,
            selected: Some(true),
        },
    )
    .await?;
    let second = order_service::checkout(&state, &customer, checkout_request())
        .await?
        .data
        .unwrap()
        .order;
    // Below the free-shipping threshold the flat fee applies.
    assert_eq!(second.subtotal, 3_000);
    assert_eq!(second.shipping_fee, PricingPolicy::default().flat_shipping_fee);
    assert_eq!(
        product_service::get_product(&state, cable).await?.data.unwrap().stock,
        48
    );
    let cancelled = order_service::cancel_order(&state, &customer, second.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(
        product_service::get_product(&state, cable).await?.data.unwrap().stock,
        50
    );

    // Ordered products cannot be deleted.
    assert!(matches!(
        product_service::delete_product(&state, &admin, laptop).await,
        Err(AppError::Conflict(_))
    ));

    // Deactivated customers can no longer log in; admins cannot lock themselves out.
    assert!(matches!(
        customer_service::deactivate_customer(&state, &admin, admin.user_id).await,
        Err(AppError::BadRequest(_))
    ));
    customer_service::deactivate_customer(&state, &admin, customer.user_id).await?;
    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "secret123".into(),
        },
    )
    .await;
    assert!(matches!(login, Err(AppError::Unauthorized(_))));

    Ok(())
}

fn status_change(status: OrderStatus, tracking_number: Option<String>) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status,
        tracking_number,
        notes: None,
    }
}
