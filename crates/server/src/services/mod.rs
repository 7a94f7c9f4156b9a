//! Business logic sitting between route handlers and repositories.

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod oauth;

pub use auth::{AuthError, AuthService};
pub use catalog::CatalogCache;
pub use checkout::CheckoutError;
pub use oauth::{OAuthClient, OAuthError, OAuthProfile};
