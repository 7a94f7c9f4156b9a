//! Vendor account management.
//!
//! Vendors cannot sign up through OAuth, so operators can create them here
//! as well as through `POST /api/auth/signup` with `"role": "vendor"`.

use dishdash_core::UserRole;
use dishdash_server::services::AuthService;

/// Create a vendor account with a password.
///
/// # Errors
///
/// Returns an error if the email is taken, the password is too weak or the
/// database is unreachable.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let user = AuthService::new(&pool)
        .register_with_password(email, password, name, UserRole::Vendor)
        .await?;

    tracing::info!(
        "Vendor created! ID: {}, Email: {}",
        user.id,
        user.email.as_str()
    );
    tracing::info!("Next: sign in and PUT /api/vendor/restaurant, or run `dd-cli seed catalog`");
    Ok(())
}
