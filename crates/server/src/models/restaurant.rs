//! Restaurant domain types.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dishdash_core::cart::PricingPolicy;
use dishdash_core::slots::OpeningHours;
use dishdash_core::stats::RatingSummary;
use dishdash_core::{RestaurantId, UserId};

const MAX_NAME_LENGTH: usize = 120;

/// A restaurant owned by a vendor.
#[derive(Debug, Clone, Serialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: String,
    pub address: String,
    pub image_url: Option<String>,
    /// Local wall-clock opening time.
    pub opens_at: NaiveTime,
    /// Local wall-clock closing time; before `opens_at` means after midnight.
    pub closes_at: NaiveTime,
    pub delivery_fee: Decimal,
    pub free_delivery_threshold: Option<Decimal>,
    pub minimum_order: Decimal,
    pub discount_percent: Decimal,
    /// Vendor-controlled switch; closed restaurants cannot take orders.
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    #[must_use]
    pub const fn opening_hours(&self) -> OpeningHours {
        OpeningHours {
            opens: self.opens_at,
            closes: self.closes_at,
        }
    }

    /// Pricing rules for this restaurant combined with the platform tax rate.
    #[must_use]
    pub const fn pricing_policy(&self, tax_rate: Decimal) -> PricingPolicy {
        PricingPolicy {
            delivery_fee: self.delivery_fee,
            free_delivery_threshold: self.free_delivery_threshold,
            tax_rate,
            discount_percent: self.discount_percent,
            minimum_order: self.minimum_order,
        }
    }
}

/// Restaurant listing entry with its rating summary.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantSummary {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub rating: RatingSummary,
}

/// Body of `PUT /api/vendor/restaurant`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantInput {
    pub name: String,
    pub description: Option<String>,
    pub cuisine: String,
    pub address: String,
    pub image_url: Option<String>,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    #[serde(default)]
    pub delivery_fee: Decimal,
    pub free_delivery_threshold: Option<Decimal>,
    #[serde(default)]
    pub minimum_order: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

const fn default_true() -> bool {
    true
}

impl RestaurantInput {
    /// Check field ranges before writing.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is required".to_string());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!("name must be at most {MAX_NAME_LENGTH} characters"));
        }
        if self.cuisine.trim().is_empty() {
            return Err("cuisine is required".to_string());
        }
        if self.address.trim().is_empty() {
            return Err("address is required".to_string());
        }
        if self.delivery_fee < Decimal::ZERO {
            return Err("delivery_fee cannot be negative".to_string());
        }
        if self.minimum_order < Decimal::ZERO {
            return Err("minimum_order cannot be negative".to_string());
        }
        if self
            .free_delivery_threshold
            .is_some_and(|t| t < Decimal::ZERO)
        {
            return Err("free_delivery_threshold cannot be negative".to_string());
        }
        if self.discount_percent < Decimal::ZERO || self.discount_percent > Decimal::ONE_HUNDRED {
            return Err("discount_percent must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> RestaurantInput {
        serde_json::from_value(serde_json::json!({
            "name": "Curry Leaf",
            "cuisine": "South Indian",
            "address": "12 Market St",
            "opens_at": "11:00:00",
            "closes_at": "22:30:00",
            "delivery_fee": "2.50"
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_from_json() {
        let input = input();
        assert!(input.is_open);
        assert_eq!(input.minimum_order, Decimal::ZERO);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut input = input();
        input.name = "   ".to_string();
        assert_eq!(input.validate().unwrap_err(), "name is required");
    }

    #[test]
    fn test_rejects_discount_over_100() {
        let mut input = input();
        input.discount_percent = Decimal::from(101);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_fee() {
        let mut input = input();
        input.delivery_fee = Decimal::from(-1);
        assert!(input.validate().is_err());
    }
}
