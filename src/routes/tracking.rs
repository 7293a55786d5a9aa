use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::tracking::{AddTrackingEventRequest, DeliveryEstimate, TrackingList, TrackingSummaryList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderTracking,
    response::ApiResponse,
    routes::params::TrackingQuery,
    services::tracking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_tracking))
        .route("/summary", get(tracking_summary))
        .route("/orders/{order_id}", get(order_tracking))
        .route("/orders/{order_id}/events", post(add_tracking_event))
        .route("/number/{order_number}", get(tracking_by_order_number))
        .route("/shipment/{tracking_number}", get(tracking_by_tracking_number))
        .route("/estimate/{order_number}", get(delivery_estimate))
}

#[utoipa::path(
    get,
    path = "/api/tracking/summary",
    responses((status = 200, description = "Shipment summary for each of the caller's orders", body = ApiResponse<TrackingSummaryList>)),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn tracking_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TrackingSummaryList>>> {
    let resp = tracking_service::summary(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Tracking with event history", body = ApiResponse<OrderTracking>),
        (status = 404, description = "No tracking visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn order_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let resp = tracking_service::get_for_order(&state, &user, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking/number/{order_number}",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Tracking with event history", body = ApiResponse<OrderTracking>),
        (status = 404, description = "Unknown order number")
    ),
    tag = "Tracking"
)]
pub async fn tracking_by_order_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let resp = tracking_service::get_by_order_number(&state, &order_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking/shipment/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Carrier tracking number")),
    responses(
        (status = 200, description = "Tracking with event history", body = ApiResponse<OrderTracking>),
        (status = 404, description = "Unknown tracking number")
    ),
    tag = "Tracking"
)]
pub async fn tracking_by_tracking_number(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let resp = tracking_service::get_by_tracking_number(&state, &tracking_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking/estimate/{order_number}",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Delivery estimate from now", body = ApiResponse<DeliveryEstimate>),
        (status = 400, description = "Order already delivered, cancelled or refunded"),
        (status = 404, description = "Unknown order number")
    ),
    tag = "Tracking"
)]
pub async fn delivery_estimate(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<DeliveryEstimate>>> {
    let resp = tracking_service::estimate(&state, &order_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tracking/orders/{order_id}/events",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body = AddTrackingEventRequest,
    responses(
        (status = 200, description = "Event appended", body = ApiResponse<OrderTracking>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No tracking for order")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn add_tracking_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AddTrackingEventRequest>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    payload.validate()?;
    let resp = tracking_service::add_event(&state, &user, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Current tracking status"),
        ("order_number" = Option<String>, Query, description = "Exact order number"),
        ("tracking_number" = Option<String>, Query, description = "Exact tracking number")
    ),
    responses(
        (status = 200, description = "Matching shipments", body = ApiResponse<TrackingList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn search_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TrackingQuery>,
) -> AppResult<Json<ApiResponse<TrackingList>>> {
    let resp = tracking_service::search(&state, &user, query).await?;
    Ok(Json(resp))
}
