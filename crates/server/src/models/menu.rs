//! Menu domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dishdash_core::{MenuItemId, RestaurantId};

/// Category used when a vendor leaves it blank.
pub const DEFAULT_CATEGORY: &str = "Other";

/// A dish on a restaurant's menu.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    /// Unavailable items stay on the vendor's menu but cannot be ordered.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Menu items sharing a category, as shown to customers.
#[derive(Debug, Clone, Serialize)]
pub struct MenuSection {
    pub category: String,
    pub items: Vec<MenuItem>,
}

/// Group items by category, keeping the order categories first appear in.
///
/// Callers pass items already sorted by category, so this is a single pass.
#[must_use]
pub fn group_by_category(items: Vec<MenuItem>) -> Vec<MenuSection> {
    let mut sections: Vec<MenuSection> = Vec::new();
    for item in items {
        match sections.last_mut() {
            Some(section) if section.category == item.category => section.items.push(item),
            _ => sections.push(MenuSection {
                category: item.category.clone(),
                items: vec![item],
            }),
        }
    }
    sections
}

/// Body of `POST /api/vendor/menu`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

const fn default_available() -> bool {
    true
}

impl NewMenuItem {
    /// Category with blanks replaced by [`DEFAULT_CATEGORY`].
    #[must_use]
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// # Errors
    ///
    /// Returns a client-facing message for a blank name or non-positive price.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }
}

/// Body of `PATCH /api/vendor/menu/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

impl MenuItemPatch {
    /// # Errors
    ///
    /// Returns a client-facing message for a blank name or non-positive price.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("price must be greater than zero".to_string());
    }
    if price.scale() > 2 && price.round_dp(2) != price {
        return Err("price cannot have more than two decimal places".to_string());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, category: &str, name: &str) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(id),
            restaurant_id: RestaurantId::new(1),
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            price: Decimal::new(500, 2),
            image_url: None,
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_category() {
        let sections = group_by_category(vec![
            item(1, "Mains", "Dosa"),
            item(2, "Mains", "Idli"),
            item(3, "Sides", "Chutney"),
        ]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category, "Mains");
        assert_eq!(sections[0].items.len(), 2);
        assert_eq!(sections[1].items[0].name, "Chutney");
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_category(Vec::new()).is_empty());
    }

    #[test]
    fn test_price_must_be_positive() {
        let new = NewMenuItem {
            name: "Vada".to_string(),
            description: None,
            category: None,
            price: Decimal::ZERO,
            image_url: None,
            is_available: true,
        };
        assert!(new.validate().is_err());
        assert_eq!(new.category(), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_price_precision() {
        assert!(validate_price("3.999".parse().unwrap()).is_err());
        assert!(validate_price("3.500".parse().unwrap()).is_ok());
    }

    #[test]
    fn test_patch_validation() {
        let patch = MenuItemPatch {
            name: Some(String::new()),
            ..MenuItemPatch::default()
        };
        assert!(patch.validate().is_err());
        assert!(MenuItemPatch::default().validate().is_ok());
    }
}
