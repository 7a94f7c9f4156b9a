//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dishdash_core::cart::{CartLine, CartTotals};
use dishdash_core::{MenuItemId, OrderId, OrderStatus, PaymentMethod, RestaurantId, UserId};

/// A placed order with its line snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub customer_name: String,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub delivery_slot_start: DateTime<Utc>,
    pub delivery_slot_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Menu item as it was priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Everything needed to insert an order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub delivery_slot_start: DateTime<Utc>,
    pub delivery_slot_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub totals: CartTotals,
    pub lines: Vec<CartLine>,
}

/// Body of `POST /api/vendor/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
