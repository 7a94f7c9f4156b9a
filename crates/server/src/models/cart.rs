//! Cart view returned by the cart and quote endpoints.

use serde::{Deserialize, Serialize};

use dishdash_core::cart::{CartLine, CartTotals};
use dishdash_core::{CurrencyCode, MenuItemId, Price, RestaurantId};

/// Restaurant the cart is ordering from.
#[derive(Debug, Clone, Serialize)]
pub struct CartRestaurant {
    pub id: RestaurantId,
    pub name: String,
    pub is_open: bool,
}

/// The customer's cart priced with the restaurant's current rules.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub restaurant: Option<CartRestaurant>,
    pub lines: Vec<CartLine>,
    /// Items that became unavailable since they were added.
    pub unavailable_items: Vec<MenuItemId>,
    pub totals: CartTotals,
    pub currency: CurrencyCode,
    /// Total formatted for display, e.g. `$24.30`.
    pub display_total: String,
}

impl CartView {
    /// Assemble a view from already computed totals.
    #[must_use]
    pub fn new(
        restaurant: Option<CartRestaurant>,
        lines: Vec<CartLine>,
        unavailable_items: Vec<MenuItemId>,
        totals: CartTotals,
        currency: CurrencyCode,
    ) -> Self {
        let display_total = Price::new(totals.total, currency).display();
        Self {
            restaurant,
            lines,
            unavailable_items,
            totals,
            currency,
            display_total,
        }
    }

    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self::new(None, Vec::new(), Vec::new(), CartTotals::empty(), currency)
    }
}

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub menu_item_id: MenuItemId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Empty a cart holding another restaurant's items first.
    #[serde(default)]
    pub replace_cart: bool,
}

const fn default_quantity() -> i32 {
    1
}

/// Body of `PATCH /api/cart/items/{menu_item_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::empty(CurrencyCode::EUR);
        assert!(view.restaurant.is_none());
        assert_eq!(view.display_total, "€0.00");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["currency"], "EUR");
        assert_eq!(json["totals"]["item_count"], 0);
    }

    #[test]
    fn test_add_to_cart_defaults() {
        let body: AddToCart = serde_json::from_str(r#"{"menu_item_id": 4}"#).unwrap();
        assert_eq!(body.quantity, 1);
        assert!(!body.replace_cart);
    }
}
