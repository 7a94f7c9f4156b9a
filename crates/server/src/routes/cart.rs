//! Customer cart handlers.
//!
//! The cart lives in `app.cart_item` and is priced on every read. It only
//! ever holds items from one restaurant.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use dishdash_core::MenuItemId;
use dishdash_core::cart::validate_quantity;

use crate::db::carts::AddOutcome;
use crate::db::{CartRepository, MenuRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::CartView;
use crate::models::cart::{AddToCart, UpdateQuantity};
use crate::services::checkout::load_cart;
use crate::state::AppState;

async fn current_cart(state: &AppState, user: &crate::models::CurrentUser) -> Result<Json<CartView>> {
    let (view, _) = load_cart(state.pool(), user.id, &state.config().ordering).await?;
    Ok(Json(view))
}

/// # Route
///
/// `GET /api/cart`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<CartView>> {
    current_cart(&state, &user).await
}

/// Add an item, or increase its quantity if it is already in the cart.
///
/// # Route
///
/// `POST /api/cart/items`
#[instrument(skip(state, user, body), fields(user_id = %user.id, menu_item_id = %body.menu_item_id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(body): Json<AddToCart>,
) -> Result<Json<CartView>> {
    validate_quantity(body.quantity)?;

    let item = MenuRepository::new(state.pool())
        .get_by_id(body.menu_item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Menu item {} not found", body.menu_item_id)))?;
    if !item.is_available {
        return Err(AppError::BadRequest(format!(
            "{} is not available right now",
            item.name
        )));
    }

    let outcome = CartRepository::new(state.pool())
        .add(
            user.id,
            item.id,
            item.restaurant_id,
            body.quantity,
            body.replace_cart,
        )
        .await?;
    match outcome {
        AddOutcome::Added { .. } => current_cart(&state, &user).await,
        AddOutcome::OtherRestaurant => Err(AppError::Conflict(
            "Your cart has items from another restaurant; set replace_cart to start over"
                .to_string(),
        )),
        AddOutcome::Rejected(e) => Err(e.into()),
    }
}

/// Set a line's quantity; zero removes the line.
///
/// # Route
///
/// `PATCH /api/cart/items/{menu_item_id}`
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(menu_item_id): Path<MenuItemId>,
    Json(body): Json<UpdateQuantity>,
) -> Result<Json<CartView>> {
    let carts = CartRepository::new(state.pool());

    if body.quantity == 0 {
        carts.remove(user.id, menu_item_id).await?;
        return current_cart(&state, &user).await;
    }

    let quantity = validate_quantity(body.quantity)?;
    if !carts.update_quantity(user.id, menu_item_id, quantity).await? {
        return Err(AppError::NotFound("Item is not in your cart".to_string()));
    }

    current_cart(&state, &user).await
}

/// # Route
///
/// `DELETE /api/cart/items/{menu_item_id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(menu_item_id): Path<MenuItemId>,
) -> Result<Json<CartView>> {
    if !CartRepository::new(state.pool())
        .remove(user.id, menu_item_id)
        .await?
    {
        return Err(AppError::NotFound("Item is not in your cart".to_string()));
    }
    current_cart(&state, &user).await
}

/// # Route
///
/// `DELETE /api/cart`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<StatusCode> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
