//! Domain models for the API.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Request bodies live next to the model they create.

pub mod cart;
pub mod menu;
pub mod order;
pub mod restaurant;
pub mod review;
pub mod session;
pub mod user;

pub use cart::CartView;
pub use menu::{MenuItem, MenuItemPatch, MenuSection, NewMenuItem};
pub use order::{NewOrder, Order, OrderItem};
pub use restaurant::{Restaurant, RestaurantInput, RestaurantSummary};
pub use review::{NewReview, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
