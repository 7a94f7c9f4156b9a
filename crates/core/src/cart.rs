//! Cart pricing.
//!
//! Turns cart lines plus a restaurant's pricing policy into the totals shown
//! at checkout and stored on the order. Everything here is pure so the quote
//! endpoint and the order insert compute identical numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MenuItemId, round_money};

/// Largest quantity of a single menu item in one cart.
pub const MAX_LINE_QUANTITY: i32 = 50;

/// Errors raised while editing a cart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside `1..=MAX_LINE_QUANTITY`.
    #[error("quantity must be between 1 and {max} (got {got})")]
    QuantityOutOfRange {
        /// Offending quantity.
        got: i32,
        /// Upper bound.
        max: i32,
    },
}

/// Validate a line quantity.
///
/// # Errors
///
/// Returns `CartError::QuantityOutOfRange` for zero, negative or oversized
/// quantities.
pub const fn validate_quantity(quantity: i32) -> Result<i32, CartError> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(CartError::QuantityOutOfRange {
            got: quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(quantity)
}

/// One menu item in a cart, priced at its current menu price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Per-restaurant pricing rules plus the platform tax rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Flat delivery fee.
    pub delivery_fee: Decimal,
    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold: Option<Decimal>,
    /// Tax rate as a fraction (0.08 = 8%).
    pub tax_rate: Decimal,
    /// Restaurant-wide promotion, in percent of the subtotal.
    pub discount_percent: Decimal,
    /// Smallest subtotal the restaurant accepts.
    pub minimum_order: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: Decimal::ZERO,
            free_delivery_threshold: None,
            tax_rate: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            minimum_order: Decimal::ZERO,
        }
    }
}

/// Computed cart totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of quantities.
    pub item_count: i64,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Cart is non-empty and the subtotal reaches the restaurant minimum.
    pub meets_minimum: bool,
}

impl CartTotals {
    /// Totals of an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            item_count: 0,
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            meets_minimum: false,
        }
    }
}

/// Compute cart totals in a single pass over the lines.
///
/// Discount comes off the subtotal first; tax is charged on the discounted
/// subtotal; the delivery fee is not taxed and is waived once the subtotal
/// reaches the free-delivery threshold.
#[must_use]
pub fn compute_totals(lines: &[CartLine], policy: &PricingPolicy) -> CartTotals {
    if lines.is_empty() {
        return CartTotals::empty();
    }

    let (item_count, subtotal) = lines.iter().fold((0_i64, Decimal::ZERO), |(n, sum), line| {
        (n + i64::from(line.quantity), sum + line.line_total())
    });
    let subtotal = round_money(subtotal);

    let percent = policy
        .discount_percent
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let discount = round_money(subtotal * percent / Decimal::ONE_HUNDRED);

    let delivery_fee = match policy.free_delivery_threshold {
        Some(threshold) if subtotal >= threshold => Decimal::ZERO,
        _ => round_money(policy.delivery_fee.max(Decimal::ZERO)),
    };

    let tax = round_money((subtotal - discount) * policy.tax_rate.max(Decimal::ZERO));
    let total = subtotal - discount + delivery_fee + tax;

    CartTotals {
        item_count,
        subtotal,
        discount,
        delivery_fee,
        tax,
        total,
        meets_minimum: subtotal >= policy.minimum_order,
    }
}
