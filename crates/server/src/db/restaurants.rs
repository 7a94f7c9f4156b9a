//! Restaurant repository.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use dishdash_core::{RestaurantId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Restaurant, RestaurantInput};

const RESTAURANT_COLUMNS: &str = r"
    id, owner_id, name, description, cuisine, address, image_url,
    opens_at, closes_at, delivery_fee, free_delivery_threshold,
    minimum_order, discount_percent, is_open, created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct RestaurantRow {
    id: i32,
    owner_id: i32,
    name: String,
    description: Option<String>,
    cuisine: String,
    address: String,
    image_url: Option<String>,
    opens_at: NaiveTime,
    closes_at: NaiveTime,
    delivery_fee: Decimal,
    free_delivery_threshold: Option<Decimal>,
    minimum_order: Decimal,
    discount_percent: Decimal,
    is_open: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            id: RestaurantId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            name: row.name,
            description: row.description,
            cuisine: row.cuisine,
            address: row.address,
            image_url: row.image_url,
            opens_at: row.opens_at,
            closes_at: row.closes_at,
            delivery_fee: row.delivery_fee,
            free_delivery_threshold: row.free_delivery_threshold,
            minimum_order: row.minimum_order,
            discount_percent: row.discount_percent,
            is_open: row.is_open,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for restaurant database operations.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM app.restaurant WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get the restaurant owned by a vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_owner(&self, owner_id: UserId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM app.restaurant WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List restaurants by name, optionally filtered.
    ///
    /// `query` matches a case-insensitive substring of the name; `cuisine`
    /// matches the cuisine exactly, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: Option<&str>,
        cuisine: Option<&str>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let pattern = query.map(|q| format!("%{}%", escape_like(q)));

        let rows = sqlx::query_as::<_, RestaurantRow>(&format!(
            r"
            SELECT {RESTAURANT_COLUMNS}
            FROM app.restaurant
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::text IS NULL OR lower(cuisine) = lower($2))
            ORDER BY is_open DESC, name
            "
        ))
        .bind(pattern)
        .bind(cuisine)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create the vendor's restaurant, or update it if it already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another restaurant has the same name.
    pub async fn upsert_for_owner(
        &self,
        owner_id: UserId,
        input: &RestaurantInput,
    ) -> Result<Restaurant, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            r"
            INSERT INTO app.restaurant (
                owner_id, name, description, cuisine, address, image_url,
                opens_at, closes_at, delivery_fee, free_delivery_threshold,
                minimum_order, discount_percent, is_open
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (owner_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                cuisine = EXCLUDED.cuisine,
                address = EXCLUDED.address,
                image_url = EXCLUDED.image_url,
                opens_at = EXCLUDED.opens_at,
                closes_at = EXCLUDED.closes_at,
                delivery_fee = EXCLUDED.delivery_fee,
                free_delivery_threshold = EXCLUDED.free_delivery_threshold,
                minimum_order = EXCLUDED.minimum_order,
                discount_percent = EXCLUDED.discount_percent,
                is_open = EXCLUDED.is_open,
                updated_at = now()
            RETURNING {RESTAURANT_COLUMNS}
            "
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.cuisine.trim())
        .bind(input.address.trim())
        .bind(input.image_url.as_deref())
        .bind(input.opens_at)
        .bind(input.closes_at)
        .bind(input.delivery_fee)
        .bind(input.free_delivery_threshold)
        .bind(input.minimum_order)
        .bind(input.discount_percent)
        .bind(input.is_open)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "restaurant name"))?;

        Ok(row.into())
    }
}

/// Escape `LIKE` wildcards in user input.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like(" pizza "), "pizza");
        assert_eq!(escape_like("100%_off"), "100\\%\\_off");
    }
}
