use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::User;

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct AdminUpdateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub contact_number: Option<String>,
    #[validate(length(max = 500))]
    pub shipping_address: Option<String>,
    #[validate(length(max = 50))]
    pub preference: Option<String>,
    pub is_active: Option<bool>,
    /// `customer` or `admin`.
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<User>,
}
