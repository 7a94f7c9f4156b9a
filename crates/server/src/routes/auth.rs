//! Password authentication route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::user::{LoginRequest, SignupRequest};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Put `user` into the session and the Sentry scope.
pub(crate) async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and sign it in.
///
/// # Route
///
/// `POST /api/auth/signup`
#[instrument(skip(state, session, body), fields(email = %body.email, role = %body.role))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password, &body.display_name, body.role)
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Account created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
///
/// # Route
///
/// `POST /api/auth/login`
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    start_session(&session, &user).await?;
    Ok(Json(user))
}

/// Sign out.
///
/// # Route
///
/// `POST /api/auth/logout`
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in account, read fresh from the database.
///
/// # Route
///
/// `GET /api/auth/me`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(user))
}
