//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dishdash_core::{AuthProvider, Email, UserId, UserRole};

/// A DishDash account (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name shown to vendors on orders and reviews.
    pub display_name: String,
    pub role: UserRole,
    /// How the account was created.
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
