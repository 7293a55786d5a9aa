//! Admin-side customer management. Accounts are never hard-deleted; order
//! history keeps pointing at them.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        customers::{AdminUpdateCustomerRequest, CustomerList},
        orders::OrderList,
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, ROLE_ADMIN, ROLE_CUSTOMER, User},
    response::{ApiResponse, Meta},
    routes::params::{CustomerQuery, OrderListQuery, SortOrder},
    state::AppState,
};

fn check_role(role: &str) -> AppResult<&str> {
    match role {
        ROLE_ADMIN | ROLE_CUSTOMER => Ok(role),
        other => Err(AppError::BadRequest(format!("unknown role '{other}'"))),
    }
}

async fn find_customer(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn search_customers(
    state: &AppState,
    user: &AuthUser,
    query: CustomerQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(q) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::FirstName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::LastName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Email).ilike(pattern)),
        );
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(UserCol::IsActive.eq(is_active));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt)
        .order_by_asc(UserCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let customer = find_customer(state, id).await?;
    Ok(ApiResponse::success("Customer", User::from(customer), None))
}

pub async fn customer_orders(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    find_customer(state, id).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::UserId.eq(id));
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
        "Customer orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminUpdateCustomerRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if id == user.user_id && payload.is_active == Some(false) {
        return Err(AppError::BadRequest("You cannot deactivate your own account".into()));
    }

    let existing = find_customer(state, id).await?;
    let mut active: UserActive = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(contact_number) = payload.contact_number {
        active.contact_number = Set(Some(contact_number));
    }
    if let Some(shipping_address) = payload.shipping_address {
        active.shipping_address = Set(Some(shipping_address));
    }
    if let Some(preference) = payload.preference {
        active.preference = Set(Some(preference));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(role) = payload.role.as_deref() {
        active.role = Set(check_role(role)?.to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "customer_update",
        "users",
        serde_json::json!({
            "user_id": id,
            "is_active": payload.is_active,
            "role": payload.role,
        }),
    )
    .await;

    Ok(ApiResponse::success("Customer updated", User::from(updated), None))
}

pub async fn deactivate_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("You cannot deactivate your own account".into()));
    }

    let existing = find_customer(state, id).await?;
    let mut active: UserActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    tracing::info!(user_id = %id, "customer deactivated");
    audit::record(
        state,
        Some(user.user_id),
        "customer_deactivate",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Customer deactivated", User::from(updated), None))
}
