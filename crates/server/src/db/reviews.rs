//! Review repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dishdash_core::{OrderId, RestaurantId, ReviewId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Review;

const REVIEW_SELECT: &str = r"
    SELECT rv.id, rv.order_id, rv.restaurant_id, rv.customer_id,
           u.display_name AS customer_name, rv.rating, rv.comment,
           rv.vendor_reply, rv.replied_at, rv.created_at
    FROM app.review rv
    JOIN app.user u ON u.id = rv.customer_id
";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    order_id: i32,
    restaurant_id: i32,
    customer_id: i32,
    customer_name: String,
    rating: i16,
    comment: Option<String>,
    vendor_reply: Option<String>,
    replied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            order_id: OrderId::new(row.order_id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            customer_id: UserId::new(row.customer_id),
            customer_name: row.customer_name,
            rating: row.rating,
            comment: row.comment,
            vendor_reply: row.vendor_reply,
            replied_at: row.replied_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a review for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order was already reviewed.
    pub async fn create(
        &self,
        order_id: OrderId,
        restaurant_id: RestaurantId,
        customer_id: UserId,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO app.review (order_id, restaurant_id, customer_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(order_id)
        .bind(restaurant_id)
        .bind(customer_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "review for this order"))?;

        self.get_by_id(ReviewId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE rv.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// A restaurant's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE rv.restaurant_id = $1 ORDER BY rv.created_at DESC, rv.id DESC"
        ))
        .bind(restaurant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Ratings of one restaurant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<i16>, RepositoryError> {
        let ratings = sqlx::query_scalar("SELECT rating FROM app.review WHERE restaurant_id = $1")
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        Ok(ratings)
    }

    /// Ratings of every restaurant, keyed by restaurant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings_by_restaurant(
        &self,
    ) -> Result<HashMap<RestaurantId, Vec<i16>>, RepositoryError> {
        let rows: Vec<(i32, i16)> = sqlx::query_as("SELECT restaurant_id, rating FROM app.review")
            .fetch_all(self.pool)
            .await?;

        let mut grouped: HashMap<RestaurantId, Vec<i16>> = HashMap::new();
        for (restaurant_id, rating) in rows {
            grouped
                .entry(RestaurantId::new(restaurant_id))
                .or_default()
                .push(rating);
        }
        Ok(grouped)
    }

    /// Set the vendor's reply on one of the restaurant's reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not belong to the restaurant.
    pub async fn reply(
        &self,
        restaurant_id: RestaurantId,
        id: ReviewId,
        reply: &str,
    ) -> Result<Review, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE app.review SET vendor_reply = $3, replied_at = now()
            WHERE id = $1 AND restaurant_id = $2
            ",
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(reply.trim())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}
