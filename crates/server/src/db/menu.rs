//! Menu item repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use dishdash_core::{MenuItemId, RestaurantId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{MenuItem, MenuItemPatch, NewMenuItem};

const MENU_COLUMNS: &str = r"
    id, restaurant_id, name, description, category, price, image_url,
    is_available, created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: i32,
    restaurant_id: i32,
    name: String,
    description: Option<String>,
    category: String,
    price: Decimal,
    image_url: Option<String>,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: MenuItemId::new(row.id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            image_url: row.image_url,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for menu item database operations.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a restaurant's menu sorted by category then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        available_only: bool,
    ) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            SELECT {MENU_COLUMNS}
            FROM app.menu_item
            WHERE restaurant_id = $1 AND (is_available OR NOT $2)
            ORDER BY category, name
            "
        ))
        .bind(restaurant_id)
        .bind(available_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM app.menu_item WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the restaurant already has an
    /// item with this name.
    pub async fn create(
        &self,
        restaurant_id: RestaurantId,
        item: &NewMenuItem,
    ) -> Result<MenuItem, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            INSERT INTO app.menu_item
                (restaurant_id, name, description, category, price, image_url, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MENU_COLUMNS}
            "
        ))
        .bind(restaurant_id)
        .bind(item.name.trim())
        .bind(item.description.as_deref())
        .bind(item.category())
        .bind(item.price)
        .bind(item.image_url.as_deref())
        .bind(item.is_available)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "menu item"))?;

        Ok(row.into())
    }

    /// Insert or update an item matched on (restaurant, name).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        restaurant_id: RestaurantId,
        item: &NewMenuItem,
    ) -> Result<MenuItem, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            INSERT INTO app.menu_item
                (restaurant_id, name, description, category, price, image_url, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (restaurant_id, name) DO UPDATE SET
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                image_url = EXCLUDED.image_url,
                is_available = EXCLUDED.is_available,
                updated_at = now()
            RETURNING {MENU_COLUMNS}
            "
        ))
        .bind(restaurant_id)
        .bind(item.name.trim())
        .bind(item.description.as_deref())
        .bind(item.category())
        .bind(item.price)
        .bind(item.image_url.as_deref())
        .bind(item.is_available)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Apply a partial update to one of the restaurant's items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not belong to the restaurant.
    /// Returns `RepositoryError::Conflict` if the new name is already used.
    pub async fn update(
        &self,
        restaurant_id: RestaurantId,
        id: MenuItemId,
        patch: &MenuItemPatch,
    ) -> Result<MenuItem, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            UPDATE app.menu_item SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE(NULLIF($5, ''), category),
                price = COALESCE($6, price),
                image_url = COALESCE($7, image_url),
                is_available = COALESCE($8, is_available),
                updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING {MENU_COLUMNS}
            "
        ))
        .bind(id)
        .bind(restaurant_id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.description.as_deref())
        .bind(patch.category.as_deref().map(str::trim))
        .bind(patch.price)
        .bind(patch.image_url.as_deref())
        .bind(patch.is_available)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "menu item"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete one of the restaurant's items.
    ///
    /// Items referenced by past orders cannot be deleted; vendors mark them
    /// unavailable instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not belong to the restaurant.
    /// Returns `RepositoryError::Conflict` if the item appears on an order.
    pub async fn delete(
        &self,
        restaurant_id: RestaurantId,
        id: MenuItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM app.menu_item WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict(
                        "menu item has orders; mark it unavailable instead".to_owned(),
                    );
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
