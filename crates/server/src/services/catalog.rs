//! Read-through cache for the public catalog.
//!
//! Restaurant listings, restaurant details and menus are cached using `moka`
//! (5-minute TTL). Vendor edits invalidate the affected entries so customers
//! see changes immediately on this instance.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use dishdash_core::RestaurantId;
use dishdash_core::stats::RatingSummary;

use crate::db::{MenuRepository, RepositoryError, RestaurantRepository, ReviewRepository};
use crate::models::menu::group_by_category;
use crate::models::{MenuSection, Restaurant, RestaurantSummary};

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 10_000;

/// Cache key for catalog entries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    /// Unfiltered restaurant listing.
    Restaurants,
    Restaurant(RestaurantId),
    Menu(RestaurantId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Restaurants(Arc<Vec<RestaurantSummary>>),
    Restaurant(Box<Restaurant>),
    Menu(Arc<Vec<MenuSection>>),
}

/// In-process catalog cache.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// Restaurants with their rating summaries.
    ///
    /// Only the unfiltered listing is cached; searches always hit the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn restaurants(
        &self,
        pool: &PgPool,
        query: Option<&str>,
        cuisine: Option<&str>,
    ) -> Result<Arc<Vec<RestaurantSummary>>, RepositoryError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let cuisine = cuisine.map(str::trim).filter(|c| !c.is_empty());
        let cacheable = query.is_none() && cuisine.is_none();

        if cacheable
            && let Some(CacheValue::Restaurants(list)) = self.cache.get(&CacheKey::Restaurants).await
        {
            return Ok(list);
        }

        let restaurants = RestaurantRepository::new(pool).list(query, cuisine).await?;
        let mut ratings = ReviewRepository::new(pool).ratings_by_restaurant().await?;

        let list: Arc<Vec<RestaurantSummary>> = Arc::new(
            restaurants
                .into_iter()
                .map(|restaurant| {
                    let rating = RatingSummary::from_ratings(
                        &ratings.remove(&restaurant.id).unwrap_or_default(),
                    );
                    RestaurantSummary { restaurant, rating }
                })
                .collect(),
        );

        if cacheable {
            self.cache
                .insert(CacheKey::Restaurants, CacheValue::Restaurants(Arc::clone(&list)))
                .await;
        }

        Ok(list)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn restaurant(
        &self,
        pool: &PgPool,
        id: RestaurantId,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let key = CacheKey::Restaurant(id);
        if let Some(CacheValue::Restaurant(restaurant)) = self.cache.get(&key).await {
            return Ok(Some(*restaurant));
        }

        let restaurant = RestaurantRepository::new(pool).get_by_id(id).await?;
        if let Some(r) = &restaurant {
            self.cache
                .insert(key, CacheValue::Restaurant(Box::new(r.clone())))
                .await;
        }
        Ok(restaurant)
    }

    /// Available items of a restaurant grouped by category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn menu(
        &self,
        pool: &PgPool,
        id: RestaurantId,
    ) -> Result<Arc<Vec<MenuSection>>, RepositoryError> {
        let key = CacheKey::Menu(id);
        if let Some(CacheValue::Menu(menu)) = self.cache.get(&key).await {
            return Ok(menu);
        }

        let items = MenuRepository::new(pool).list_for_restaurant(id, true).await?;
        let menu = Arc::new(group_by_category(items));
        self.cache
            .insert(key, CacheValue::Menu(Arc::clone(&menu)))
            .await;
        Ok(menu)
    }

    /// Drop everything cached about a restaurant, including the listing.
    pub async fn invalidate_restaurant(&self, id: RestaurantId) {
        self.cache.invalidate(&CacheKey::Restaurant(id)).await;
        self.cache.invalidate(&CacheKey::Menu(id)).await;
        self.cache.invalidate(&CacheKey::Restaurants).await;
    }

    /// Drop the cached listing (ratings changed).
    pub async fn invalidate_listing(&self) {
        self.cache.invalidate(&CacheKey::Restaurants).await;
    }
}
