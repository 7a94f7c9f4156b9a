//! Order repository.
//!
//! Orders are written once at checkout together with a snapshot of every
//! line, so later menu edits never change what a customer was charged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use dishdash_core::stats::{OrderSnapshot, SoldLine};
use dishdash_core::{MenuItemId, OrderId, OrderStatus, PaymentMethod, RestaurantId, UserId};

use super::RepositoryError;
use super::carts::{fetch_entries, lock_cart, matches_snapshot};
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.customer_id, cu.display_name AS customer_name,
           o.restaurant_id, r.name AS restaurant_name,
           o.status, o.payment_method, o.delivery_address,
           o.delivery_slot_start, o.delivery_slot_end, o.notes,
           o.subtotal, o.discount, o.delivery_fee, o.tax, o.total,
           o.placed_at, o.updated_at
    FROM app.order o
    JOIN app.user cu ON cu.id = o.customer_id
    JOIN app.restaurant r ON r.id = o.restaurant_id
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    customer_name: String,
    restaurant_id: i32,
    restaurant_name: String,
    status: OrderStatus,
    payment_method: PaymentMethod,
    delivery_address: String,
    delivery_slot_start: DateTime<Utc>,
    delivery_slot_end: DateTime<Utc>,
    notes: Option<String>,
    subtotal: Decimal,
    discount: Decimal,
    delivery_fee: Decimal,
    tax: Decimal,
    total: Decimal,
    placed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(self.id),
            customer_id: UserId::new(self.customer_id),
            customer_name: self.customer_name,
            restaurant_id: RestaurantId::new(self.restaurant_id),
            restaurant_name: self.restaurant_name,
            status: self.status,
            payment_method: self.payment_method,
            delivery_address: self.delivery_address,
            delivery_slot_start: self.delivery_slot_start,
            delivery_slot_end: self.delivery_slot_end,
            notes: self.notes,
            subtotal: self.subtotal,
            discount: self.discount,
            delivery_fee: self.delivery_fee,
            tax: self.tax,
            total: self.total,
            placed_at: self.placed_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    menu_item_id: i32,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            menu_item_id: MenuItemId::new(row.menu_item_id),
            line_total: row.unit_price * Decimal::from(row.quantity),
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: i32,
    status: OrderStatus,
    placed_at: DateTime<Utc>,
    total: Decimal,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines, then empty the customer's cart.
    ///
    /// Runs in a single transaction under the cart lock. The cart is re-read
    /// first and must still be exactly `order.lines`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the cart no longer matches the
    /// priced lines, or `RepositoryError::Database` if any statement fails.
    /// Nothing is written in either case.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_cart(&mut tx, order.customer_id).await?;
        let current = fetch_entries(&mut tx, order.customer_id).await?;
        if !matches_snapshot(&current, order.restaurant_id, &order.lines) {
            return Err(RepositoryError::Conflict(
                "cart changed since it was priced".to_string(),
            ));
        }

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO app.order (
                customer_id, restaurant_id, status, payment_method, delivery_address,
                delivery_slot_start, delivery_slot_end, notes,
                subtotal, discount, delivery_fee, tax, total
            )
            VALUES ($1, $2, 'placed', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(order.customer_id)
        .bind(order.restaurant_id)
        .bind(order.payment_method)
        .bind(&order.delivery_address)
        .bind(order.delivery_slot_start)
        .bind(order.delivery_slot_end)
        .bind(order.notes.as_deref())
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.delivery_fee)
        .bind(order.totals.tax)
        .bind(order.totals.total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r"
                INSERT INTO app.order_item (order_id, menu_item_id, name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM app.cart_item WHERE user_id = $1")
            .bind(order.customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(OrderId::new(id))
    }

    /// Get an order by ID with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.items_for(&[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_order(items)))
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.customer_id = $1 ORDER BY o.placed_at DESC, o.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// A restaurant's orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"{ORDER_SELECT}
            WHERE o.restaurant_id = $1 AND ($2::app.order_status IS NULL OR o.status = $2)
            ORDER BY o.placed_at DESC, o.id DESC
            "
        ))
        .bind(restaurant_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Move an order from `from` to `to`.
    ///
    /// The update only applies while the order is still in `from`, so two
    /// concurrent transitions cannot both succeed. Returns `false` when the
    /// status had already changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE app.order SET status = $3, updated_at = now() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every order of a restaurant reduced to what the dashboard needs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn snapshots_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderSnapshot>, RepositoryError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r"
            SELECT id, status, placed_at, total
            FROM app.order
            WHERE restaurant_id = $1 AND ($2::timestamptz IS NULL OR placed_at >= $2)
            ",
        )
        .bind(restaurant_id)
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderSnapshot {
                status: row.status,
                placed_at: row.placed_at,
                total: row.total,
                lines: items
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| SoldLine {
                        menu_item_id: item.menu_item_id,
                        name: item.name,
                        quantity: item.quantity,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect())
    }

    async fn items_for(&self, order_ids: &[i32]) -> Result<HashMap<i32, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, menu_item_id, name, unit_price, quantity
            FROM app.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}
