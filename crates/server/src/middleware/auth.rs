//! Authentication extractors.
//!
//! Route handlers declare who may call them by extracting one of:
//!
//! - [`RequireAuth`] - any signed-in user
//! - [`RequireCustomer`] - signed-in customer
//! - [`RequireVendor`] - signed-in vendor

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use dishdash_core::UserRole;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in customer.
pub struct RequireCustomer(pub CurrentUser);

/// Extractor that requires a signed-in vendor.
pub struct RequireVendor(pub CurrentUser);

/// Error returned when the caller is not allowed through.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not signed in.
    Unauthorized,
    /// Signed in with the wrong role.
    Forbidden(UserRole),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required".to_string()),
            Self::Forbidden(required) => (
                StatusCode::FORBIDDEN,
                format!("Only {required} accounts can do this"),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn require_role(parts: &Parts, role: UserRole) -> Result<CurrentUser, AuthRejection> {
    let user = current_user(parts).await.ok_or(AuthRejection::Unauthorized)?;
    if user.role != role {
        return Err(AuthRejection::Forbidden(role));
    }
    Ok(user)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, UserRole::Customer).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireVendor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, UserRole::Vendor).await.map(Self)
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is rotated first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Sign the user out by discarding the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn test_rejections_render_json() {
        let response = AuthRejection::Forbidden(UserRole::Vendor).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Only vendor accounts can do this");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        let result = RequireCustomer::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));
    }
}
