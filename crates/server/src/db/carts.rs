//! Cart repository.
//!
//! Carts are stored per customer; each row is one menu item and its quantity.
//! Prices are never stored here, they are read from the menu on every load.
//!
//! Writes that read the cart before changing it hold the customer's row lock
//! (`app.user ... FOR UPDATE`) so they serialize with each other and with
//! checkout.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use dishdash_core::cart::{CartError, CartLine, validate_quantity};
use dishdash_core::{MenuItemId, RestaurantId, UserId};

use super::RepositoryError;

const ENTRIES_SELECT: &str = r"
    SELECT c.menu_item_id, m.name, m.price, c.quantity, m.is_available, m.restaurant_id
    FROM app.cart_item c
    JOIN app.menu_item m ON m.id = c.menu_item_id
    WHERE c.user_id = $1
    ORDER BY c.added_at, c.menu_item_id
";

/// A cart line joined with the state of its menu item.
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub line: CartLine,
    pub restaurant_id: RestaurantId,
    pub is_available: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct CartEntryRow {
    menu_item_id: i32,
    name: String,
    price: Decimal,
    quantity: i32,
    is_available: bool,
    restaurant_id: i32,
}

impl From<CartEntryRow> for CartEntry {
    fn from(row: CartEntryRow) -> Self {
        Self {
            line: CartLine {
                menu_item_id: MenuItemId::new(row.menu_item_id),
                name: row.name,
                unit_price: row.price,
                quantity: row.quantity,
            },
            restaurant_id: RestaurantId::new(row.restaurant_id),
            is_available: row.is_available,
        }
    }
}

/// Result of [`CartRepository::add`].
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The line now holds `quantity`.
    Added { quantity: i32 },
    /// The cart holds another restaurant's items and `replace` was not set.
    OtherRestaurant,
    /// The combined quantity is out of bounds; nothing was written.
    Rejected(CartError),
}

/// Take the customer's cart lock for the rest of the transaction.
pub(crate) async fn lock_cart(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM app.user WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(())
}

pub(crate) async fn fetch_entries(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartEntry>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartEntryRow>(ENTRIES_SELECT)
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Whether the cart as it stands now is exactly the priced `lines`: same
/// items, quantities and prices, all available from `restaurant_id`.
#[must_use]
pub fn matches_snapshot(entries: &[CartEntry], restaurant_id: RestaurantId, lines: &[CartLine]) -> bool {
    entries.len() == lines.len()
        && entries.iter().all(|entry| {
            entry.is_available
                && entry.restaurant_id == restaurant_id
                && lines.iter().any(|line| {
                    line.menu_item_id == entry.line.menu_item_id
                        && line.quantity == entry.line.quantity
                        && line.unit_price == entry.line.unit_price
                })
        })
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the customer's cart in the order items were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn entries(&self, user_id: UserId) -> Result<Vec<CartEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartEntryRow>(ENTRIES_SELECT)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add `quantity` of an item from `restaurant_id`, keeping the cart to a
    /// single restaurant.
    ///
    /// With `replace` set, a cart holding another restaurant's items is
    /// emptied first. The check and the write share one transaction under
    /// the cart lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn add(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        restaurant_id: RestaurantId,
        quantity: i32,
        replace: bool,
    ) -> Result<AddOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_cart(&mut tx, user_id).await?;

        let current: Option<i32> = sqlx::query_scalar(
            r"
            SELECT m.restaurant_id
            FROM app.cart_item c
            JOIN app.menu_item m ON m.id = c.menu_item_id
            WHERE c.user_id = $1 AND m.restaurant_id <> $2
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_optional(&mut *tx)
        .await?;

        if current.is_some() {
            if !replace {
                return Ok(AddOutcome::OtherRestaurant);
            }
            sqlx::query("DELETE FROM app.cart_item WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let existing: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM app.cart_item WHERE user_id = $1 AND menu_item_id = $2",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let quantity = match validate_quantity(existing.unwrap_or(0).saturating_add(quantity)) {
            Ok(q) => q,
            Err(e) => return Ok(AddOutcome::Rejected(e)),
        };

        sqlx::query(
            r"
            INSERT INTO app.cart_item (user_id, menu_item_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, menu_item_id) DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AddOutcome::Added { quantity })
    }

    /// Overwrite the quantity of a line already in the cart. Returns whether
    /// the line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE app.cart_item SET quantity = $3 WHERE user_id = $1 AND menu_item_id = $2",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove one line. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM app.cart_item WHERE user_id = $1 AND menu_item_id = $2")
            .bind(user_id)
            .bind(menu_item_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM app.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, price: i64, quantity: i32) -> CartLine {
        CartLine {
            menu_item_id: MenuItemId::new(id),
            name: format!("Item {id}"),
            unit_price: Decimal::from(price),
            quantity,
        }
    }

    fn entry(id: i32, price: i64, quantity: i32, restaurant: i32) -> CartEntry {
        CartEntry {
            line: line(id, price, quantity),
            restaurant_id: RestaurantId::new(restaurant),
            is_available: true,
        }
    }

    #[test]
    fn test_unchanged_cart_matches() {
        let lines = [line(1, 8, 2), line(2, 3, 1)];
        let entries = [entry(2, 3, 1, 7), entry(1, 8, 2, 7)];
        assert!(matches_snapshot(&entries, RestaurantId::new(7), &lines));
    }

    #[test]
    fn test_added_or_requantified_line_does_not_match() {
        let lines = [line(1, 8, 2)];
        let added = [entry(1, 8, 2, 7), entry(3, 5, 1, 7)];
        assert!(!matches_snapshot(&added, RestaurantId::new(7), &lines));

        let requantified = [entry(1, 8, 3, 7)];
        assert!(!matches_snapshot(&requantified, RestaurantId::new(7), &lines));

        assert!(!matches_snapshot(&[], RestaurantId::new(7), &lines));
    }

    #[test]
    fn test_repriced_unavailable_or_foreign_line_does_not_match() {
        let lines = [line(1, 8, 2)];
        assert!(!matches_snapshot(&[entry(1, 9, 2, 7)], RestaurantId::new(7), &lines));
        assert!(!matches_snapshot(&[entry(1, 8, 2, 4)], RestaurantId::new(7), &lines));

        let mut withdrawn = entry(1, 8, 2, 7);
        withdrawn.is_available = false;
        assert!(!matches_snapshot(&[withdrawn], RestaurantId::new(7), &lines));
    }
}
