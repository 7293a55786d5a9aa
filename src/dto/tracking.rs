use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{models::OrderTracking, status::TrackingEventType};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddTrackingEventRequest {
    pub event_type: TrackingEventType,
    /// Defaults to the event type's standard wording.
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    pub operator: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingSummary {
    pub order_number: String,
    pub current_status: TrackingEventType,
    pub last_update: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub progress_percentage: u8,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryEstimate {
    pub estimated_days: i64,
    pub estimated_delivery_date: DateTime<Utc>,
    pub shipping_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingList {
    pub items: Vec<OrderTracking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingSummaryList {
    pub items: Vec<TrackingSummary>,
}
