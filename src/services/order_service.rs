use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems, Relation as CartRelation},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::tracking_service::{self, NewEvent},
    state::AppState,
    status::OrderStatus,
};

/// `AWE` + UTC timestamp to the second + first 8 hex digits of the order id.
pub fn build_order_number(now: DateTime<Utc>, order_id: Uuid) -> String {
    let hex = order_id.simple().to_string();
    format!(
        "AWE{}{}",
        now.format("%Y%m%d%H%M%S"),
        hex[..8].to_uppercase()
    )
}

#[derive(Debug, FromQueryResult)]
struct CheckoutLine {
    product_id: Uuid,
    quantity: i32,
    name: String,
    price: i64,
    stock: i32,
    is_available: bool,
}

pub(crate) async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect())
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderWithItems> {
    let items = order_items(conn, order.id).await?;
    Ok(OrderWithItems {
        order: Order::try_from(order)?,
        items,
    })
}

/// Put the ordered quantities back on the shelf.
async fn restock<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    for item in items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .col_expr(
                ProdCol::SalesCount,
                Expr::col(ProdCol::SalesCount).sub(item.quantity),
            )
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

/// What an admin may attach to a status change.
#[derive(Debug, Default)]
pub(crate) struct StatusChange {
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub operator: Option<String>,
}

/// Move a locked order to `next`, stamping timestamps, restocking on
/// cancellation and appending the matching tracking event.
pub(crate) async fn apply_status<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    next: OrderStatus,
    change: StatusChange,
) -> AppResult<OrderModel> {
    let current: OrderStatus = order.status.parse()?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {current} to {next}"
        )));
    }

    let now = Utc::now();
    let order_id = order.id;
    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().to_string());
    match next {
        OrderStatus::Paid => active.paid_at = Set(Some(now.into())),
        OrderStatus::Shipped => active.shipped_at = Set(Some(now.into())),
        OrderStatus::Delivered => active.delivered_at = Set(Some(now.into())),
        _ => {}
    }
    if let Some(tracking_number) = change.tracking_number.clone() {
        active.tracking_number = Set(Some(tracking_number));
    }
    if let Some(notes) = change.notes.clone() {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(now.into());
    let updated = active.update(conn).await?;

    if next == OrderStatus::Cancelled {
        restock(conn, order_id).await?;
    }

    if let Some(event_type) = next.tracking_event() {
        tracking_service::append_event(
            conn,
            order_id,
            NewEvent {
                event_type,
                description: change.notes,
                location: None,
                operator: change.operator,
                tracking_number: change.tracking_number,
            },
        )
        .await?;
    }

    Ok(updated)
}

async fn lock_own_order<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<OrderModel> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .select_only()
        .column(CartCol::ProductId)
        .column(CartCol::Quantity)
        .column_as(ProdCol::Name, "name")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .column_as(ProdCol::IsAvailable, "is_available")
        .join(JoinType::InnerJoin, CartRelation::Products.def())
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::Selected.eq(true)),
        )
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .into_model::<CheckoutLine>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::BadRequest("No items selected for checkout".into()));
    }

    for line in &lines {
        if !line.is_available {
            return Err(AppError::BadRequest(format!(
                "{} is no longer available",
                line.name
            )));
        }
        if line.quantity <= 0 || line.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                line.name
            )));
        }
    }

    let item_count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
    let subtotal: i64 = lines.iter().map(|l| l.price * i64::from(l.quantity)).sum();
    let totals = state.pricing().quote(item_count, subtotal);

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let shipping_address = serde_json::to_value(&payload.shipping_address)
        .map_err(|e| AppError::Internal(e.into()))?;

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        order_number: Set(build_order_number(now, order_id)),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        shipping_address: Set(shipping_address),
        subtotal: Set(totals.subtotal),
        tax_amount: Set(totals.tax),
        shipping_fee: Set(totals.shipping),
        total_amount: Set(totals.total),
        notes: Set(payload.notes),
        tracking_number: Set(None),
        paid_at: Set(None),
        shipped_at: Set(None),
        delivered_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            product_name: Set(line.name.clone()),
            unit_price: Set(line.price),
            quantity: Set(line.quantity),
            line_total: Set(line.price * i64::from(line.quantity)),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .col_expr(
                ProdCol::SalesCount,
                Expr::col(ProdCol::SalesCount).add(line.quantity),
            )
            .col_expr(ProdCol::UpdatedAt, Expr::value(now))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    // Unselected lines stay in the cart for later.
    CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::Selected.eq(true)),
        )
        .exec(&txn)
        .await?;

    tracking_service::start_tracking(&txn, &order).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = order.total_amount,
        "order placed"
    );
    audit::record(
        state,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: Order::try_from(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order", data, Some(Meta::empty())))
}

pub async fn get_order_by_number(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::OrderNumber.eq(order_number)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order", data, Some(Meta::empty())))
}

/// Records payment; no gateway is contacted.
pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = lock_own_order(&txn, user, id).await?;
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(format!(
            "Only pending orders can be paid; order is {}",
            order.status
        )));
    }

    let order = apply_status(&txn, order, OrderStatus::Paid, StatusChange::default()).await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order paid");
    audit::record(
        state,
        Some(user.user_id),
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": id, "payment_method": data.order.payment_method }),
    )
    .await;

    Ok(ApiResponse::success("Payment recorded", data, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = lock_own_order(&txn, user, id).await?;
    let current: OrderStatus = order.status.parse()?;
    if !current.is_cancellable() {
        return Err(AppError::BadRequest(format!(
            "Order can no longer be cancelled; it is {current}"
        )));
    }

    let order = apply_status(
        &txn,
        order,
        OrderStatus::Cancelled,
        StatusChange {
            operator: Some("customer".into()),
            ..StatusChange::default()
        },
    )
    .await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order cancelled by customer");
    audit::record(
        state,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id, "previous_status": current }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TrackingEventType;
    use chrono::TimeZone;

    #[test]
    fn order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 13, 7, 9).unwrap();
        let id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(build_order_number(now, id), "AWE202605041307093F2A9C1E");
    }

    #[test]
    fn order_number_is_fixed_width() {
        let number = build_order_number(Utc::now(), Uuid::new_v4());
        assert_eq!(number.len(), 3 + 14 + 8);
        assert!(number[17..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn cancelled_orders_get_a_tracking_event() {
        assert_eq!(
            OrderStatus::Cancelled.tracking_event(),
            Some(TrackingEventType::Cancelled)
        );
    }
}
