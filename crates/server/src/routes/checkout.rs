//! Checkout handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::Order;
use crate::services::checkout::{self, CheckoutRequest, Quote};
use crate::state::AppState;

/// Price the cart without placing anything.
///
/// # Route
///
/// `POST /api/checkout/quote`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn quote(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<Quote>> {
    let quote = checkout::quote(state.pool(), user.id, &state.config().ordering).await?;
    Ok(Json(quote))
}

/// Turn the cart into an order.
///
/// # Route
///
/// `POST /api/checkout`
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let id = checkout::place_order(
        state.pool(),
        user.id,
        &state.config().ordering,
        &body,
        Utc::now(),
    )
    .await
    .inspect_err(|e| tracing::info!(error = %e, "Checkout rejected"))?;

    let order = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("order {id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(order)))
}
