use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{
        AddToCartRequest, CartLine, CartView, MAX_LINE_QUANTITY, UpdateCartItemRequest,
    },
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    pricing::{CartTotals, LineAmount},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct CartLineRow {
    product_id: Uuid,
    name: String,
    price: i64,
    image: Option<String>,
    category: String,
    quantity: i32,
    selected: bool,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            line_total: row.price * i64::from(row.quantity),
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            image: row.image,
            category: row.category,
            quantity: row.quantity,
            selected: row.selected,
        }
    }
}

/// Current cart with display fields joined from the catalog, oldest line first.
pub async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT p.id AS product_id, p.name, p.price, p.images->>0 AS image, p.category,
               ci.quantity, ci.selected
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC, p.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<CartLine> = rows.into_iter().map(CartLine::from).collect();
    let amounts: Vec<LineAmount> = items
        .iter()
        .map(|line| LineAmount {
            unit_price: line.price,
            quantity: line.quantity,
            selected: line.selected,
        })
        .collect();
    let totals = state.pricing().totals(&amounts);

    Ok(CartView { items, totals })
}

fn check_quantity(quantity: i32) -> AppResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = load_cart(state, user.user_id).await?;
    let count = view.items.len() as i64;
    Ok(ApiResponse::success("OK", view, Some(Meta::new(1, count, count))))
}

pub async fn cart_summary(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartTotals>> {
    let view = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("OK", view.totals, None))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    check_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;

    // Exclusive so concurrent adds of the same product queue up behind each other.
    let product = Products::find_by_id(payload.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if !product.is_available {
        return Err(AppError::BadRequest("Product is unavailable".to_string()));
    }

    let exist = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(payload.product_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let now = Utc::now();
    let quantity = match exist {
        Some(item) => {
            let quantity = item
                .quantity
                .checked_add(payload.quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "At most {MAX_LINE_QUANTITY} units per cart line"
                    ))
                })?;
            if quantity > product.stock {
                return Err(AppError::BadRequest("Insufficient stock".to_string()));
            }
            let mut active: CartActive = item.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
            quantity
        }
        None => {
            if payload.quantity > product.stock {
                return Err(AppError::BadRequest("Insufficient stock".to_string()));
            }
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                selected: Set(true),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, "Cart changed concurrently, retry"))?;
            payload.quantity
        }
    };

    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, product_id = %payload.product_id, quantity, "cart line set");
    audit::record(
        state,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": quantity }),
    )
    .await;

    let view = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", view, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity.is_none() && payload.selected.is_none() {
        return Err(AppError::BadRequest("nothing to update".to_string()));
    }

    let item = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(product_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CartActive = item.into();
    if let Some(quantity) = payload.quantity {
        check_quantity(quantity)?;
        let product = Products::find_by_id(product_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        if quantity > product.stock {
            return Err(AppError::BadRequest("Insufficient stock".to_string()));
        }
        active.quantity = Set(quantity);
    }
    if let Some(selected) = payload.selected {
        active.selected = Set(selected);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({
            "product_id": product_id,
            "quantity": payload.quantity,
            "selected": payload.selected,
        }),
    )
    .await;

    let view = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", view, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(product_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    let view = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", view, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": result.rows_affected }),
    )
    .await;

    let view = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart cleared", view, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(check_quantity(0), Err(AppError::BadRequest(_))));
        assert!(matches!(check_quantity(i32::MAX), Err(AppError::BadRequest(_))));
    }
}
