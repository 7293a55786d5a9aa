#![allow(dead_code)]

use awe_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{auth::RegisterRequest, orders::CheckoutRequest, products::CreateProductRequest},
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::{ROLE_ADMIN, ShippingAddress},
    pricing::PricingPolicy,
    services::{auth_service, product_service},
    state::AppState,
    status::PaymentMethod,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// State against the test database, or `None` (after a note on stderr) when
/// neither `TEST_DATABASE_URL` nor `DATABASE_URL` is set.
pub async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run it.");
            return Ok(None);
        }
    };

    let config = AppConfig {
        database_url: database_url.clone(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-test-secret".into(),
        access_token_ttl_minutes: 30,
        refresh_token_ttl_days: 7,
        pricing: PricingPolicy::default(),
        cors_allowed_origin: None,
    };
    let pool = create_pool(&database_url).await?;
    let state = AppState::new(pool, config);
    run_migrations(&state.orm).await?;
    Ok(Some(state))
}

/// Short per-run tag so rows from different runs never collide.
pub fn run_tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub async fn create_admin(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        first_name: Set("Store".into()),
        last_name: Set("Admin".into()),
        email: Set(email.to_string()),
        password_hash: Set(auth_service::hash_password("admin123")?),
        contact_number: Set(None),
        shipping_address: Set(None),
        preference: Set(None),
        role: Set(ROLE_ADMIN.into()),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub fn register_request(first_name: &str, last_name: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: first_name.into(),
        last_name: last_name.into(),
        email: email.into(),
        password: "secret123".into(),
        contact_number: None,
        shipping_address: None,
        preference: None,
    }
}

/// Registers a customer; returns the authenticated user and its refresh token.
pub async fn register_customer(
    state: &AppState,
    first_name: &str,
    email: &str,
) -> anyhow::Result<(AuthUser, String)> {
    let tokens = auth_service::register_user(state, register_request(first_name, "Shopper", email))
        .await?
        .data
        .unwrap();
    Ok((
        AuthUser {
            user_id: tokens.user.id,
            role: tokens.user.role.clone(),
        },
        tokens.refresh_token,
    ))
}

pub fn product_request(name: &str, price: i64, stock: i32) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: Some("Integration test product".into()),
        price,
        category: "Test".into(),
        manufacturer: Some("AWE".into()),
        specifications: Default::default(),
        images: vec![],
        rating: 0.0,
        review_count: 0,
        stock,
        is_available: true,
    }
}

pub async fn create_product(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = product_service::create_product(state, admin, product_request(name, price, stock))
        .await?
        .data
        .unwrap();
    Ok(product.id)
}

pub fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        shipping_address: ShippingAddress {
            recipient_name: "Sam Shopper".into(),
            phone: "0400000000".into(),
            address_line1: "1 George St".into(),
            address_line2: None,
            city: "Sydney".into(),
            state: "NSW".into(),
            postal_code: "2000".into(),
            country: "Australia".into(),
        },
        payment_method: PaymentMethod::CreditCard,
        notes: None,
    }
}
