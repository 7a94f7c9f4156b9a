//! Google and Facebook sign-in.
//!
//! The login handler stores `"{provider}:{state}"` in the session and
//! redirects to the provider. The callback accepts the state exactly once.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dishdash_core::AuthProvider;

use crate::error::{AppError, Result};
use crate::models::{User, session_keys};
use crate::services::{AuthService, OAuthClient};
use crate::state::AppState;

use super::auth::start_session;

const STATE_LENGTH: usize = 32;

/// Query parameters of the provider redirect back to us.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined.
    pub error: Option<String>,
}

fn generate_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..STATE_LENGTH)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

/// Resolve a configured provider from the path segment.
fn client<'a>(state: &'a AppState, provider: &str) -> Result<&'a OAuthClient> {
    provider
        .parse::<AuthProvider>()
        .ok()
        .and_then(|p| state.oauth(p))
        .ok_or_else(|| AppError::NotFound(format!("Sign-in provider {provider} is not available")))
}

fn redirect_uri(state: &AppState, provider: AuthProvider) -> String {
    format!(
        "{}/api/auth/{provider}/callback",
        state.config().base_url.trim_end_matches('/')
    )
}

/// Redirect to the provider's consent page.
///
/// # Route
///
/// `GET /api/auth/{provider}/login`
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let client = client(&state, &provider)?;
    let csrf = generate_state();

    session
        .insert(
            session_keys::OAUTH_STATE,
            format!("{}:{csrf}", client.provider()),
        )
        .await?;

    let url = client.authorization_url(&redirect_uri(&state, client.provider()), &csrf);
    Ok(Redirect::to(&url))
}

/// Finish sign-in: check state, exchange the code, resolve the account.
///
/// # Route
///
/// `GET /api/auth/{provider}/callback`
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<User>> {
    let client = client(&state, &provider)?;

    // One-time use, whatever happens next
    let stored: Option<String> = session.remove(session_keys::OAUTH_STATE).await?;

    if let Some(error) = query.error {
        tracing::warn!(%provider, %error, "Provider returned an error");
        return Err(AppError::Unauthorized("Sign-in was cancelled".to_string()));
    }

    let expected = query
        .state
        .map(|s| format!("{}:{s}", client.provider()));
    if stored.is_none() || stored != expected {
        tracing::warn!(%provider, "OAuth state mismatch");
        return Err(crate::services::AuthError::InvalidSessionState.into());
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let token = client
        .exchange_code(&code, &redirect_uri(&state, client.provider()))
        .await?;
    let profile = client.fetch_profile(&token).await?;

    let user = AuthService::new(state.pool())
        .sign_in_with_oauth(client.provider(), &profile)
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, %provider, "Signed in with OAuth");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_state() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
