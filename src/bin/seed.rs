use awe_store_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    models::{ROLE_ADMIN, ROLE_CUSTOMER},
    services::auth_service::hash_password,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(pool.clone())).await?;

    let admin_id = ensure_user(&pool, "Store", "Admin", "admin@awe.example", "admin123", ROLE_ADMIN).await?;
    let customer_id =
        ensure_user(&pool, "Demo", "Customer", "customer@awe.example", "customer123", ROLE_CUSTOMER)
            .await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Existing accounts keep their password; only the role is enforced.
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, first_name, last_name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        (
            "AWE Pro Laptop 14",
            "Lightweight 14-inch laptop with all-day battery",
            189_900_i64,
            "Laptops",
            "AWE",
            json!({ "cpu": "8-core", "memory": "16GB", "storage": "512GB SSD", "display": "14in 2.8K" }),
            4.6,
            128,
            25,
        ),
        (
            "Nova X Smartphone",
            "6.5-inch OLED phone with triple camera",
            119_900,
            "Smartphones",
            "Nova",
            json!({ "display": "6.5in OLED", "storage": "256GB", "camera": "50MP triple" }),
            4.4,
            342,
            40,
        ),
        (
            "Pulse ANC Headphones",
            "Over-ear wireless headphones with active noise cancelling",
            34_900,
            "Audio",
            "Pulse",
            json!({ "battery": "30h", "connectivity": "Bluetooth 5.3" }),
            4.7,
            210,
            60,
        ),
        (
            "Vista 27 4K Monitor",
            "27-inch 4K IPS monitor with USB-C",
            54_900,
            "Monitors",
            "Vista",
            json!({ "resolution": "3840x2160", "panel": "IPS", "refresh": "60Hz" }),
            4.3,
            87,
            15,
        ),
        (
            "Orbit Smartwatch",
            "Fitness tracking smartwatch with GPS",
            29_900,
            "Wearables",
            "Orbit",
            json!({ "battery": "7 days", "water_resistance": "5ATM" }),
            4.1,
            64,
            4,
        ),
        (
            "Tab S 11 Tablet",
            "11-inch tablet for work and play",
            79_900,
            "Tablets",
            "Nova",
            json!({ "display": "11in LCD", "storage": "128GB" }),
            4.2,
            51,
            3,
        ),
    ];

    for (name, description, price, category, manufacturer, specifications, rating, reviews, stock) in
        products
    {
        let image = format!(
            "/images/products/{}.jpg",
            name.to_lowercase().replace(' ', "-")
        );
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, manufacturer,
                                  specifications, images, rating, review_count, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(manufacturer)
        .bind(specifications)
        .bind(json!([image]))
        .bind(rating)
        .bind(reviews)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
