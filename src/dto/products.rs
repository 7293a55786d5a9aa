use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(custom(function = "validate_product_name"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "price must be greater than 0"))]
    pub price: i64,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(default)]
    pub rating: f64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub review_count: i32,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Names are stored trimmed, so the length rule applies to the trimmed text.
fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < 2 {
        return Err(ValidationError::new("length")
            .with_message("Product name must be at least 2 characters long".into()));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(custom(function = "validate_product_name"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "price must be greater than 0"))]
    pub price: Option<i64>,
    #[validate(length(min = 1))]
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
    #[validate(range(min = 0))]
    pub review_count: Option<i32>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct NameList {
    #[schema(value_type = Vec<String>)]
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct InventoryAdjustRequest {
    /// Signed change to apply to the stock level.
    #[validate(range(min = -100000, max = 100000))]
    pub delta: i32,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}
