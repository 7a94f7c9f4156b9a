//! Customer order history, cancellation and reviews.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use dishdash_core::{OrderId, OrderStatus, UserId};

use crate::db::{OrderRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::review::NewReview;
use crate::models::{Order, Review};
use crate::state::AppState;

/// Load one of the customer's orders; other customers' orders are not found.
async fn own_order(state: &AppState, customer_id: UserId, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|o| o.customer_id == customer_id)
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

/// # Route
///
/// `GET /api/orders`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(user.id)
        .await?;
    Ok(Json(orders))
}

/// # Route
///
/// `GET /api/orders/{id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(own_order(&state, user.id, id).await?))
}

/// Cancel an order the restaurant has not accepted yet.
///
/// # Route
///
/// `POST /api/orders/{id}/cancel`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = own_order(&state, user.id, id).await?;
    if order.status != OrderStatus::Placed {
        return Err(AppError::Conflict(format!(
            "Order is {} and can no longer be cancelled",
            order.status.as_str()
        )));
    }

    let orders = OrderRepository::new(state.pool());
    // The restaurant may have accepted it in the meantime
    if !orders
        .update_status(id, OrderStatus::Placed, OrderStatus::Cancelled)
        .await?
    {
        return Err(AppError::Conflict(
            "Order is no longer cancellable".to_string(),
        ));
    }
    tracing::info!(order_id = %id, "Order cancelled by customer");

    Ok(Json(own_order(&state, user.id, id).await?))
}

/// Rate a delivered order, once.
///
/// # Route
///
/// `POST /api/orders/{id}/review`
#[instrument(skip(state, user, body), fields(user_id = %user.id, rating = body.rating))]
pub async fn review(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<OrderId>,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    body.validate().map_err(AppError::BadRequest)?;

    let order = own_order(&state, user.id, id).await?;
    if order.status != OrderStatus::Delivered {
        return Err(AppError::Conflict(
            "Only delivered orders can be reviewed".to_string(),
        ));
    }

    let review = ReviewRepository::new(state.pool())
        .create(
            order.id,
            order.restaurant_id,
            user.id,
            body.rating,
            body.comment(),
        )
        .await?;
    state.catalog().invalidate_listing().await;

    Ok((StatusCode::CREATED, Json(review)))
}
