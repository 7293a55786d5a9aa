//! Shipment tracking: one `order_tracking` row per order plus an append-only
//! event log. Order status changes and admin updates both append here.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::tracking::{
        AddTrackingEventRequest, DeliveryEstimate, TrackingList, TrackingSummary,
        TrackingSummaryList,
    },
    entity::{
        order_tracking::{
            ActiveModel as TrackingActive, Column as TrackingCol, Entity as Trackings,
            Model as TrackingModel,
        },
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        tracking_events::{
            ActiveModel as EventActive, Column as EventCol, Entity as TrackingEvents,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderTracking, TrackingEvent},
    response::{ApiResponse, Meta},
    routes::params::TrackingQuery,
    state::AppState,
    status::TrackingEventType,
};

const STORE_LOCATION: &str = "AWE Electronics online store";

/// Delivery date promised by the current stage, counted from when tracking began.
pub fn estimated_delivery(
    status: TrackingEventType,
    started_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    status
        .delivery_hours()
        .map(|hours| started_at + Duration::hours(hours))
}

pub fn shipping_method(hours: i64) -> &'static str {
    if hours <= 24 {
        "express"
    } else if hours <= 72 {
        "expedited"
    } else {
        "standard"
    }
}

/// Fresh estimate from `now`; `None` once the shipment is finished.
pub fn delivery_estimate(status: TrackingEventType, now: DateTime<Utc>) -> Option<DeliveryEstimate> {
    let hours = status.delivery_hours()?;
    Some(DeliveryEstimate {
        estimated_days: hours / 24,
        estimated_delivery_date: now + Duration::hours(hours),
        shipping_method: shipping_method(hours).to_string(),
    })
}

/// Create the tracking record for a new order with its `order_created` event.
pub async fn start_tracking<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<()> {
    TrackingActive {
        order_id: Set(order.id),
        order_number: Set(order.order_number.clone()),
        user_id: Set(order.user_id),
        tracking_number: Set(None),
        current_status: Set(TrackingEventType::OrderCreated.as_str().to_string()),
        created_at: Set(order.created_at),
        updated_at: Set(order.created_at),
    }
    .insert(conn)
    .await?;

    EventActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        event_type: Set(TrackingEventType::OrderCreated.as_str().to_string()),
        description: Set(TrackingEventType::OrderCreated.default_description().to_string()),
        location: Set(Some(STORE_LOCATION.to_string())),
        operator: Set(None),
        occurred_at: Set(order.created_at),
    }
    .insert(conn)
    .await?;

    Ok(())
}

pub struct NewEvent {
    pub event_type: TrackingEventType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub operator: Option<String>,
    pub tracking_number: Option<String>,
}

impl NewEvent {
    pub fn of(event_type: TrackingEventType) -> Self {
        Self {
            event_type,
            description: None,
            location: None,
            operator: None,
            tracking_number: None,
        }
    }
}

/// Append an event and move the record's current status to it.
pub async fn append_event<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    event: NewEvent,
) -> AppResult<TrackingModel> {
    let tracking = Trackings::find_by_id(order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(number) = event.tracking_number.as_deref() {
        let holder = Trackings::find()
            .filter(TrackingCol::TrackingNumber.eq(number))
            .filter(TrackingCol::OrderId.ne(order_id))
            .one(conn)
            .await?;
        if holder.is_some() {
            return Err(AppError::Conflict(tracking_number_taken(number)));
        }
    }

    let now = Utc::now();
    EventActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        event_type: Set(event.event_type.as_str().to_string()),
        description: Set(event
            .description
            .unwrap_or_else(|| event.event_type.default_description().to_string())),
        location: Set(event.location),
        operator: Set(event.operator),
        occurred_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    let mut active: TrackingActive = tracking.into();
    active.current_status = Set(event.event_type.as_str().to_string());
    let number = event.tracking_number;
    if let Some(tracking_number) = number.clone() {
        active.tracking_number = Set(Some(tracking_number));
    }
    active.updated_at = Set(now.into());
    active.update(conn).await.map_err(|e| match number.as_deref() {
        Some(number) => AppError::conflict_on_unique(e, tracking_number_taken(number)),
        None => AppError::OrmError(e),
    })
}

fn tracking_number_taken(number: &str) -> String {
    format!("Tracking number {number} is already assigned")
}

async fn with_events<C: ConnectionTrait>(conn: &C, model: TrackingModel) -> AppResult<OrderTracking> {
    let events = TrackingEvents::find()
        .filter(EventCol::OrderId.eq(model.order_id))
        .order_by_asc(EventCol::OccurredAt)
        .all(conn)
        .await?
        .into_iter()
        .map(TrackingEvent::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let current_status: TrackingEventType = model.current_status.parse()?;
    let created_at = model.created_at.with_timezone(&Utc);
    Ok(OrderTracking {
        order_id: model.order_id,
        order_number: model.order_number,
        user_id: model.user_id,
        tracking_number: model.tracking_number,
        current_status,
        progress_percentage: current_status.progress_percentage(),
        estimated_delivery: estimated_delivery(current_status, created_at),
        events,
        created_at,
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub async fn get_for_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderTracking>> {
    let mut condition = Condition::all().add(TrackingCol::OrderId.eq(order_id));
    if !user.is_admin() {
        condition = condition.add(TrackingCol::UserId.eq(user.user_id));
    }
    let model = Trackings::find()
        .filter(condition)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let tracking = with_events(&state.orm, model).await?;
    Ok(ApiResponse::success("Tracking", tracking, None))
}

pub async fn get_by_order_number(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<OrderTracking>> {
    let model = Trackings::find()
        .filter(TrackingCol::OrderNumber.eq(order_number))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let tracking = with_events(&state.orm, model).await?;
    Ok(ApiResponse::success("Tracking", tracking, None))
}

pub async fn get_by_tracking_number(
    state: &AppState,
    tracking_number: &str,
) -> AppResult<ApiResponse<OrderTracking>> {
    let model = Trackings::find()
        .filter(TrackingCol::TrackingNumber.eq(tracking_number))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let tracking = with_events(&state.orm, model).await?;
    Ok(ApiResponse::success("Tracking", tracking, None))
}

pub async fn summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<TrackingSummaryList>> {
    let items = Trackings::find()
        .filter(TrackingCol::UserId.eq(user.user_id))
        .order_by_desc(TrackingCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| -> AppResult<TrackingSummary> {
            let status: TrackingEventType = model.current_status.parse()?;
            Ok(TrackingSummary {
                order_number: model.order_number,
                current_status: status,
                last_update: model.updated_at.with_timezone(&Utc),
                estimated_delivery: estimated_delivery(status, model.created_at.with_timezone(&Utc)),
                progress_percentage: status.progress_percentage(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Tracking summary",
        TrackingSummaryList { items },
        None,
    ))
}

pub async fn estimate(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<DeliveryEstimate>> {
    let model = Trackings::find()
        .filter(TrackingCol::OrderNumber.eq(order_number))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let status: TrackingEventType = model.current_status.parse()?;
    let estimate = delivery_estimate(status, Utc::now()).ok_or_else(|| {
        AppError::BadRequest(format!("Order is already {status}; no delivery estimate"))
    })?;
    Ok(ApiResponse::success("Delivery estimate", estimate, None))
}

pub async fn add_event(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: AddTrackingEventRequest,
) -> AppResult<ApiResponse<OrderTracking>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let event_type = payload.event_type;
    let model = append_event(
        &txn,
        order_id,
        NewEvent {
            event_type,
            description: payload.description,
            location: payload.location,
            operator: payload.operator,
            tracking_number: payload.tracking_number.clone(),
        },
    )
    .await?;
    if let Some(number) = payload.tracking_number.clone() {
        let order = Orders::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut order: OrderActive = order.into();
        order.tracking_number = Set(Some(number));
        order.updated_at = Set(Utc::now().into());
        order.update(&txn).await?;
    }
    let tracking = with_events(&txn, model).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order_id, event = %event_type, "tracking event added");
    audit::record(
        state,
        Some(user.user_id),
        "tracking_event",
        "order_tracking",
        serde_json::json!({
            "order_id": order_id,
            "event_type": event_type,
            "tracking_number": payload.tracking_number,
        }),
    )
    .await;

    Ok(ApiResponse::success("Tracking updated", tracking, None))
}

pub async fn search(
    state: &AppState,
    user: &AuthUser,
    query: TrackingQuery,
) -> AppResult<ApiResponse<TrackingList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(TrackingCol::CurrentStatus.eq(status.as_str()));
    }
    if let Some(order_number) = query.order_number.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(TrackingCol::OrderNumber.eq(order_number.clone()));
    }
    if let Some(tracking_number) = query.tracking_number.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(TrackingCol::TrackingNumber.eq(tracking_number.clone()));
    }

    let finder = Trackings::find()
        .filter(condition)
        .order_by_desc(TrackingCol::UpdatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(models.len());
    for model in models {
        items.push(with_events(&state.orm, model).await?);
    }

    Ok(ApiResponse::success(
        "Tracking",
        TrackingList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
