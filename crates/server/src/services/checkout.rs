//! Cart pricing, delivery slots and order placement.
//!
//! Carts are priced on every read from current menu prices, so the quote a
//! customer sees and the totals stored on the order come from the same
//! computation.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use dishdash_core::cart::{CartLine, compute_totals};
use dishdash_core::slots::{self, OpeningHours, SlotPolicy};
use dishdash_core::{MenuItemId, OrderId, PaymentMethod, RestaurantId, UserId};

use crate::config::OrderingConfig;
use crate::db::carts::CartEntry;
use crate::db::{CartRepository, OrderRepository, RepositoryError, RestaurantRepository};
use crate::models::cart::CartRestaurant;
use crate::models::{CartView, NewOrder, Restaurant};

const MAX_ADDRESS_LENGTH: usize = 500;
const MAX_NOTES_LENGTH: usize = 500;

/// Reasons a cart cannot be turned into an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("restaurant is not accepting orders")]
    RestaurantClosed,

    #[error("some items in the cart are no longer available")]
    ItemsUnavailable,

    #[error("minimum order is {minimum} (cart subtotal {subtotal})")]
    BelowMinimum { minimum: Decimal, subtotal: Decimal },

    #[error("delivery slot is not available")]
    SlotUnavailable,

    #[error("cart changed during checkout; review it and try again")]
    CartChanged,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Body of `POST /api/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    /// Start of one of the offered slots, in any offset.
    pub slot_start: DateTime<FixedOffset>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// A delivery slot as returned to clients, in restaurant local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Response of `POST /api/checkout/quote`.
#[derive(Debug, Serialize)]
pub struct Quote {
    #[serde(flatten)]
    pub cart: CartView,
    /// Whether `POST /api/checkout` would accept this cart.
    pub ready: bool,
    /// Why the cart cannot be checked out yet.
    pub reason: Option<String>,
}

/// Load and price the customer's cart.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails.
pub async fn load_cart(
    pool: &PgPool,
    user_id: UserId,
    ordering: &OrderingConfig,
) -> Result<(CartView, Option<Restaurant>), RepositoryError> {
    let entries = CartRepository::new(pool).entries(user_id).await?;
    let Some(first) = entries.first() else {
        return Ok((CartView::empty(ordering.currency), None));
    };

    let restaurant = RestaurantRepository::new(pool)
        .get_by_id(first.restaurant_id)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "cart references missing restaurant {}",
                first.restaurant_id
            ))
        })?;

    let (lines, unavailable) = split_entries(entries, restaurant.id);
    let totals = compute_totals(&lines, &restaurant.pricing_policy(ordering.tax_rate));

    let view = CartView::new(
        Some(CartRestaurant {
            id: restaurant.id,
            name: restaurant.name.clone(),
            is_open: restaurant.is_open,
        }),
        lines,
        unavailable,
        totals,
        ordering.currency,
    );

    Ok((view, Some(restaurant)))
}

/// Separate the lines that can be priced from those that cannot: items that
/// were withdrawn, and any from a restaurant other than `restaurant_id`.
fn split_entries(
    entries: Vec<CartEntry>,
    restaurant_id: RestaurantId,
) -> (Vec<CartLine>, Vec<MenuItemId>) {
    let mut lines = Vec::with_capacity(entries.len());
    let mut unavailable = Vec::new();
    for entry in entries {
        if entry.is_available && entry.restaurant_id == restaurant_id {
            lines.push(entry.line);
        } else {
            unavailable.push(entry.line.menu_item_id);
        }
    }
    (lines, unavailable)
}

/// Price the cart and report whether it can be checked out.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails.
pub async fn quote(
    pool: &PgPool,
    user_id: UserId,
    ordering: &OrderingConfig,
) -> Result<Quote, RepositoryError> {
    let (cart, restaurant) = load_cart(pool, user_id, ordering).await?;
    let reason = validate_cart(&cart, restaurant.as_ref())
        .err()
        .map(|e| e.to_string());

    Ok(Quote {
        ready: reason.is_none(),
        reason,
        cart,
    })
}

/// Place an order for the customer's cart.
///
/// Every check runs before anything is written; the order, its lines and
/// the emptied cart are then committed together. If the cart was edited
/// after it was priced the order is refused with `CartChanged`.
///
/// # Errors
///
/// Returns a `CheckoutError` describing the first failed check.
pub async fn place_order(
    pool: &PgPool,
    user_id: UserId,
    ordering: &OrderingConfig,
    request: &CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<OrderId, CheckoutError> {
    let delivery_address = request.delivery_address.trim();
    if delivery_address.is_empty() {
        return Err(CheckoutError::InvalidRequest(
            "delivery_address is required".to_string(),
        ));
    }
    if delivery_address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(CheckoutError::InvalidRequest(format!(
            "delivery_address must be at most {MAX_ADDRESS_LENGTH} characters"
        )));
    }
    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
        return Err(CheckoutError::InvalidRequest(format!(
            "notes must be at most {MAX_NOTES_LENGTH} characters"
        )));
    }

    let (cart, restaurant) = load_cart(pool, user_id, ordering).await?;
    validate_cart(&cart, restaurant.as_ref())?;
    let restaurant = restaurant.ok_or(CheckoutError::EmptyCart)?;

    let (slot_start, slot_end) = resolve_slot(
        request.slot_start,
        &restaurant.opening_hours(),
        &ordering.slots,
        ordering.local_offset,
        now,
    )
    .ok_or(CheckoutError::SlotUnavailable)?;

    let order = NewOrder {
        customer_id: user_id,
        restaurant_id: restaurant.id,
        payment_method: request.payment_method,
        delivery_address: delivery_address.to_string(),
        delivery_slot_start: slot_start,
        delivery_slot_end: slot_end,
        notes: notes.map(String::from),
        totals: cart.totals,
        lines: cart.lines,
    };

    let id = OrderRepository::new(pool)
        .create(&order)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CheckoutError::CartChanged,
            other => CheckoutError::Repository(other),
        })?;
    tracing::info!(order_id = %id, restaurant_id = %restaurant.id, total = %order.totals.total, "Order placed");
    Ok(id)
}

/// Slots a restaurant still offers on `date` (restaurant local date).
///
/// Closed restaurants offer nothing.
#[must_use]
pub fn offered_slots(
    restaurant: &Restaurant,
    date: NaiveDate,
    ordering: &OrderingConfig,
    now: DateTime<Utc>,
) -> Vec<SlotView> {
    if !restaurant.is_open {
        return Vec::new();
    }

    let offset = ordering.local_offset;
    let now_local = now.with_timezone(&offset).naive_local();

    slots::generate(date, &restaurant.opening_hours(), &ordering.slots, now_local)
        .into_iter()
        .filter_map(|slot| {
            Some(SlotView {
                start: offset.from_local_datetime(&slot.start).single()?,
                end: offset.from_local_datetime(&slot.end).single()?,
            })
        })
        .collect()
}

/// Today's date in restaurant local time.
#[must_use]
pub fn local_today(ordering: &OrderingConfig, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&ordering.local_offset).date_naive()
}

/// Check that a priced cart can be ordered.
fn validate_cart(cart: &CartView, restaurant: Option<&Restaurant>) -> Result<(), CheckoutError> {
    let Some(restaurant) = restaurant else {
        return Err(CheckoutError::EmptyCart);
    };
    if !restaurant.is_open {
        return Err(CheckoutError::RestaurantClosed);
    }
    if !cart.unavailable_items.is_empty() {
        return Err(CheckoutError::ItemsUnavailable);
    }
    if cart.lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if !cart.totals.meets_minimum {
        return Err(CheckoutError::BelowMinimum {
            minimum: restaurant.minimum_order,
            subtotal: cart.totals.subtotal,
        });
    }
    Ok(())
}

/// Match a requested slot start against the slots currently offered.
///
/// A slot after midnight may belong to the previous day's service window,
/// so both service days are checked. Returns the slot bounds in UTC.
fn resolve_slot(
    requested: DateTime<FixedOffset>,
    hours: &OpeningHours,
    policy: &SlotPolicy,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    // Client-supplied; may sit at the edge of the calendar.
    let start = requested
        .naive_utc()
        .checked_add_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))?;
    let now_local = now.with_timezone(&offset).naive_local();
    let date = start.date();

    let slot = [Some(date), date.pred_opt()]
        .into_iter()
        .flatten()
        .find_map(|day| slots::is_offered(start, day, hours, policy, now_local))?;

    let to_utc = |t: NaiveDateTime| {
        offset
            .from_local_datetime(&t)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    };
    Some((to_utc(slot.start)?, to_utc(slot.end)?))
}
