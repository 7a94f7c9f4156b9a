//! Public catalog: restaurants, menus, reviews and delivery slots.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dishdash_core::RestaurantId;
use dishdash_core::stats::RatingSummary;

use crate::db::ReviewRepository;
use crate::error::{AppError, Result};
use crate::models::{MenuSection, Restaurant, RestaurantSummary, Review};
use crate::services::checkout::{SlotView, local_today, offered_slots};
use crate::state::AppState;

/// Query string of `GET /api/restaurants`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of the name.
    pub q: Option<String>,
    pub cuisine: Option<String>,
}

/// Query string of the delivery slot listing.
#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// Local date, defaults to today.
    pub date: Option<NaiveDate>,
}

/// Reviews with their summary.
#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

/// Slots offered on one date.
#[derive(Debug, Serialize)]
pub struct SlotList {
    pub date: NaiveDate,
    pub slots: Vec<SlotView>,
}

pub(crate) async fn find_restaurant(state: &AppState, id: RestaurantId) -> Result<Restaurant> {
    state
        .catalog()
        .restaurant(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Restaurant {id} not found")))
}

/// # Route
///
/// `GET /api/restaurants?q&cuisine`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Arc<Vec<RestaurantSummary>>>> {
    let list = state
        .catalog()
        .restaurants(state.pool(), query.q.as_deref(), query.cuisine.as_deref())
        .await?;
    Ok(Json(list))
}

/// # Route
///
/// `GET /api/restaurants/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
) -> Result<Json<Restaurant>> {
    Ok(Json(find_restaurant(&state, id).await?))
}

/// Available menu items grouped by category.
///
/// # Route
///
/// `GET /api/restaurants/{id}/menu`
#[instrument(skip(state))]
pub async fn menu(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
) -> Result<Json<Arc<Vec<MenuSection>>>> {
    find_restaurant(&state, id).await?;
    Ok(Json(state.catalog().menu(state.pool(), id).await?))
}

/// # Route
///
/// `GET /api/restaurants/{id}/reviews`
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
) -> Result<Json<ReviewList>> {
    find_restaurant(&state, id).await?;

    let reviews = ReviewRepository::new(state.pool())
        .list_for_restaurant(id)
        .await?;
    let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();

    Ok(Json(ReviewList {
        summary: RatingSummary::from_ratings(&ratings),
        reviews,
    }))
}

/// Delivery slots still offered on a date.
///
/// # Route
///
/// `GET /api/restaurants/{id}/delivery-slots?date=YYYY-MM-DD`
#[instrument(skip(state))]
pub async fn delivery_slots(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotList>> {
    let restaurant = find_restaurant(&state, id).await?;
    let ordering = &state.config().ordering;
    let now = Utc::now();
    let date = query.date.unwrap_or_else(|| local_today(ordering, now));

    Ok(Json(SlotList {
        date,
        slots: offered_slots(&restaurant, date, ordering, now),
    }))
}
