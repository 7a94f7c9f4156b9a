//! Authentication service.
//!
//! Provides email/password accounts and sign-in through OAuth identity
//! providers. OAuth accounts are always customers; vendor accounts are
//! created by signing up with a password or through `dd-cli vendor create`.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use dishdash_core::{AuthProvider, Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::oauth::OAuthProfile;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length accepted for hashing.
const MAX_PASSWORD_LENGTH: usize = 256;

/// Maximum display name length.
const MAX_DISPLAY_NAME_LENGTH: usize = 80;

/// Sign-up and sign-in for both roles.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidDisplayName` if the name is blank or too long.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let display_name = validate_display_name(display_name)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        self.users
            .create_with_password(&email, display_name, role, &password_hash)
            .await
            .map_err(taken_email)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account has no password.
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Resolve the account for an OAuth sign-in, creating it if needed.
    ///
    /// An identity already linked wins. Otherwise the identity is linked to
    /// the account with the same email, or a new customer account is created.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingEmail` if the provider shared no email and
    /// the identity is not linked yet.
    pub async fn sign_in_with_oauth(
        &self,
        provider: AuthProvider,
        profile: &OAuthProfile,
    ) -> Result<User, AuthError> {
        if let Some(user) = self.users.get_by_identity(provider, &profile.subject).await? {
            return Ok(user);
        }

        let email = profile.email.as_deref().ok_or(AuthError::MissingEmail)?;
        let email = Email::parse(email)?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            self.users
                .link_identity(user.id, provider, &profile.subject)
                .await?;
            tracing::info!(user_id = %user.id, %provider, "Linked OAuth identity to existing account");
            return Ok(user);
        }

        let display_name = profile
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.local_part())
            .chars()
            .take(MAX_DISPLAY_NAME_LENGTH)
            .collect::<String>();

        let user = self
            .users
            .create_with_identity(&email, &display_name, provider, &profile.subject)
            .await
            .map_err(taken_email)?;

        tracing::info!(user_id = %user.id, %provider, "Created account from OAuth sign-in");
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user no longer exists.
    pub async fn get_user(&self, user_id: dishdash_core::UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// Unique violations on account creation mean the email is registered.
fn taken_email(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

fn validate_display_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidDisplayName(
            "display name is required".to_string(),
        ));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(AuthError::InvalidDisplayName(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Argon2id PHC string with a fresh random salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// A malformed stored hash counts as a failed login, not a server error.
fn verify_password(password: &str, stored: &str) -> Result<(), AuthError> {
    let stored = PasswordHash::new(stored).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &stored)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert_eq!(validate_display_name("  Ana  ").unwrap(), "Ana");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"n".repeat(MAX_DISPLAY_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
