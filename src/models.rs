use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entity::{order_items, orders, products, tracking_events, users},
    error::{AppError, AppResult},
    status::{OrderStatus, PaymentMethod, TrackingEventType},
};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CUSTOMER: &str = "customer";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub shipping_address: Option<String>,
    pub preference: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            contact_number: model.contact_number,
            shipping_address: model.shipping_address,
            preference: model.preference,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Price in cents.
    pub price: i64,
    pub category: String,
    pub manufacturer: Option<String>,
    pub specifications: BTreeMap<String, String>,
    pub images: Vec<String>,
    pub rating: f64,
    pub review_count: i32,
    pub stock: i32,
    pub is_available: bool,
    pub sales_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        // Catalog JSON columns are written by this service only; a malformed value
        // degrades to empty rather than hiding the product.
        let specifications = serde_json::from_value(model.specifications).unwrap_or_default();
        let images = serde_json::from_value(model.images).unwrap_or_default();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            category: model.category,
            manufacturer: model.manufacturer,
            specifications,
            images,
            rating: model.rating,
            review_count: model.review_count,
            stock: model.stock,
            is_available: model.is_available,
            sales_count: model.sales_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "recipient_name is required"))]
    pub recipient_name: String,
    #[validate(length(min = 6, max = 32, message = "phone must be 6-32 characters"))]
    pub phone: String,
    #[validate(length(min = 1, message = "address_line1 is required"))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 3, max = 10, message = "postal_code must be 3-10 characters"))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "Australia".to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub shipping_fee: i64,
    pub total_amount: i64,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: orders::Model) -> AppResult<Self> {
        let shipping_address = serde_json::from_value(model.shipping_address)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt shipping address: {e}")))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            order_number: model.order_number,
            status: model.status.parse()?,
            payment_method: model.payment_method.parse()?,
            shipping_address,
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            shipping_fee: model.shipping_fee,
            total_amount: model.total_amount,
            notes: model.notes,
            tracking_number: model.tracking_number,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            shipped_at: model.shipped_at.map(|dt| dt.with_timezone(&Utc)),
            delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            unit_price: model.unit_price,
            quantity: model.quantity,
            line_total: model.line_total,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackingEvent {
    pub event_type: TrackingEventType,
    pub description: String,
    pub location: Option<String>,
    pub operator: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<tracking_events::Model> for TrackingEvent {
    type Error = AppError;

    fn try_from(model: tracking_events::Model) -> AppResult<Self> {
        Ok(Self {
            event_type: model.event_type.parse()?,
            description: model.description,
            location: model.location,
            operator: model.operator,
            occurred_at: model.occurred_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderTracking {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub tracking_number: Option<String>,
    pub current_status: TrackingEventType,
    pub progress_percentage: u8,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub events: Vec<TrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
