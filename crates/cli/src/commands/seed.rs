//! Seed restaurants and menus from YAML.
//!
//! ```yaml
//! restaurants:
//!   - owner_email: luigi@example.com   # optional with --owner-email
//!     name: Luigi's Trattoria
//!     cuisine: italian
//!     address: 12 Via Roma
//!     opens_at: "11:00:00"
//!     closes_at: "22:30:00"
//!     delivery_fee: "2.50"
//!     minimum_order: "15.00"
//!     menu:
//!       - name: Margherita
//!         category: Pizza
//!         price: "9.50"
//! ```
//!
//! Re-running the same file updates rows in place: restaurants are matched
//! by owner, menu items by (restaurant, name).

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use dishdash_core::{Email, UserRole};
use dishdash_server::db::{MenuRepository, RestaurantRepository, UserRepository};
use dishdash_server::models::{NewMenuItem, RestaurantInput};

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub restaurants: Vec<SeedRestaurant>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRestaurant {
    pub owner_email: Option<String>,
    #[serde(flatten)]
    pub restaurant: RestaurantInput,
    #[serde(default)]
    pub menu: Vec<NewMenuItem>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{restaurant}: no owner_email and no --owner-email given")]
    MissingOwner { restaurant: String },

    #[error("{restaurant}: owner {email} is not a vendor account")]
    NotAVendor { restaurant: String, email: String },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },
}

/// Check every entry before touching the database.
fn validate(file: &CatalogFile, default_owner: Option<&str>) -> Vec<SeedError> {
    let mut errors = Vec::new();

    for entry in &file.restaurants {
        let name = entry.restaurant.name.trim().to_string();

        if entry.owner_email.is_none() && default_owner.is_none() {
            errors.push(SeedError::MissingOwner {
                restaurant: name.clone(),
            });
        }
        if let Err(message) = entry.restaurant.validate() {
            errors.push(SeedError::Invalid {
                context: name.clone(),
                message,
            });
        }
        for item in &entry.menu {
            if let Err(message) = item.validate() {
                errors.push(SeedError::Invalid {
                    context: format!("{name} / {}", item.name.trim()),
                    message,
                });
            }
        }
    }

    errors
}

/// Load a catalog file into the database.
///
/// # Errors
///
/// Returns an error if the file is invalid, an owner is missing or is not a
/// vendor, or a database write fails.
pub async fn catalog(
    path: &Path,
    default_owner: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(path = %path.display(), "Loading catalog");
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file, default_owner);
    if !errors.is_empty() {
        tracing::error!("Catalog validation failed:");
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);
    let restaurants = RestaurantRepository::new(&pool);
    let menu = MenuRepository::new(&pool);

    let mut items_written = 0_usize;
    for entry in &file.restaurants {
        let name = entry.restaurant.name.trim().to_string();
        let owner_email = entry
            .owner_email
            .as_deref()
            .or(default_owner)
            .ok_or_else(|| SeedError::MissingOwner {
                restaurant: name.clone(),
            })?;

        let owner = users
            .get_by_email(&Email::parse(owner_email)?)
            .await?
            .filter(|u| u.role == UserRole::Vendor)
            .ok_or_else(|| SeedError::NotAVendor {
                restaurant: name.clone(),
                email: owner_email.to_string(),
            })?;

        let restaurant = restaurants
            .upsert_for_owner(owner.id, &entry.restaurant)
            .await?;

        for item in &entry.menu {
            menu.upsert(restaurant.id, item).await?;
            items_written += 1;
        }

        tracing::info!(
            restaurant_id = %restaurant.id,
            items = entry.menu.len(),
            "Seeded {name}"
        );
    }

    tracing::info!("Seeding complete!");
    tracing::info!("  Restaurants: {}", file.restaurants.len());
    tracing::info!("  Menu items: {items_written}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
restaurants:
  - owner_email: luigi@example.com
    name: Luigi's Trattoria
    cuisine: italian
    address: 12 Via Roma
    opens_at: "11:00:00"
    closes_at: "22:30:00"
    delivery_fee: "2.50"
    minimum_order: "15.00"
    menu:
      - name: Margherita
        category: Pizza
        price: "9.50"
      - name: Tiramisu
        price: "5.00"
        is_available: false
  - name: Night Noodles
    cuisine: chinese
    address: 3 Canal St
    opens_at: "18:00:00"
    closes_at: "02:00:00"
"#;

    #[test]
    fn test_parse_catalog_file() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(file.restaurants.len(), 2);

        let luigi = &file.restaurants[0];
        assert_eq!(luigi.owner_email.as_deref(), Some("luigi@example.com"));
        assert_eq!(luigi.menu.len(), 2);
        assert_eq!(luigi.menu[0].category(), "Pizza");
        assert!(!luigi.menu[1].is_available);
        assert!(luigi.restaurant.is_open);

        assert!(file.restaurants[1].menu.is_empty());
    }

    #[test]
    fn test_validate_requires_an_owner() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();

        let errors = validate(&file, None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SeedError::MissingOwner { restaurant } if restaurant == "Night Noodles"
        ));

        assert!(validate(&file, Some("ops@example.com")).is_empty());
    }

    #[test]
    fn test_validate_reports_bad_items() {
        let yaml = r#"
restaurants:
  - name: Cheap Eats
    cuisine: diner
    address: 1 Main St
    opens_at: "08:00:00"
    closes_at: "16:00:00"
    menu:
      - name: Free Lunch
        price: "0"
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&file, Some("ops@example.com"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("Cheap Eats / Free Lunch"));
    }
}
