//! HTTP routes for the DishDash API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Readiness (database ping)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/signup                         - Create account, sign in
//! POST /api/auth/login                          - Password sign-in
//! POST /api/auth/logout                         - Sign out
//! GET  /api/auth/me                             - Current account
//! GET  /api/auth/{provider}/login               - Redirect to Google/Facebook
//! GET  /api/auth/{provider}/callback            - OAuth callback
//!
//! # Catalog (public)
//! GET  /api/restaurants                         - Listing with ratings
//! GET  /api/restaurants/{id}                    - Restaurant detail
//! GET  /api/restaurants/{id}/menu               - Available items by category
//! GET  /api/restaurants/{id}/reviews            - Reviews and rating summary
//! GET  /api/restaurants/{id}/delivery-slots     - Slots for a date
//!
//! # Customer
//! GET    /api/cart                              - Priced cart
//! DELETE /api/cart                              - Empty the cart
//! POST   /api/cart/items                        - Add item
//! PATCH  /api/cart/items/{menu_item_id}         - Set quantity
//! DELETE /api/cart/items/{menu_item_id}         - Remove item
//! POST   /api/checkout/quote                    - Totals and readiness
//! POST   /api/checkout                          - Place order
//! GET    /api/orders                            - Order history
//! GET    /api/orders/{id}                       - Order detail
//! POST   /api/orders/{id}/cancel                - Cancel a placed order
//! POST   /api/orders/{id}/review                - Review a delivered order
//!
//! # Vendor
//! GET|PUT /api/vendor/restaurant                - Owned restaurant
//! GET|POST /api/vendor/menu                     - Menu items
//! PATCH|DELETE /api/vendor/menu/{id}            - Edit or delete an item
//! GET  /api/vendor/orders                       - Incoming orders
//! GET  /api/vendor/orders/{id}                  - Order detail
//! POST /api/vendor/orders/{id}/status           - Advance an order
//! GET  /api/vendor/reviews                      - Reviews
//! POST /api/vendor/reviews/{id}/reply           - Reply to a review
//! GET  /api/vendor/dashboard                    - Statistics
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod oauth;
pub mod orders;
pub mod vendor;

use axum::{
    Router,
    extract::State,
    http::{Request, StatusCode},
    middleware::from_fn,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/{provider}/login", get(oauth::login))
        .route("/{provider}/callback", get(oauth::callback))
        .layer(auth_rate_limiter())
}

/// Create the public catalog router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list))
        .route("/{id}", get(catalog::show))
        .route("/{id}/menu", get(catalog::menu))
        .route("/{id}/reviews", get(catalog::reviews))
        .route("/{id}/delivery-slots", get(catalog::delivery_slots))
}

/// Create the customer cart, checkout and order routes.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{menu_item_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/checkout/quote", post(checkout::quote))
        .route("/checkout", post(checkout::place))
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/review", post(orders::review))
}

/// Create the vendor back-office router.
pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/restaurant",
            get(vendor::restaurant::show).put(vendor::restaurant::upsert),
        )
        .route("/menu", get(vendor::menu::list).post(vendor::menu::create))
        .route(
            "/menu/{id}",
            patch(vendor::menu::update).delete(vendor::menu::delete),
        )
        .route("/orders", get(vendor::orders::list))
        .route("/orders/{id}", get(vendor::orders::show))
        .route("/orders/{id}/status", post(vendor::orders::update_status))
        .route("/reviews", get(vendor::reviews::list))
        .route("/reviews/{id}/reply", post(vendor::reviews::reply))
        .route("/dashboard", get(vendor::dashboard::show))
}

/// Create all `/api` routes.
pub fn api_routes() -> Router<AppState> {
    let general = Router::new()
        .nest("/restaurants", catalog_routes())
        .merge(customer_routes())
        .nest("/vendor", vendor_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/auth", auth_routes())
        .merge(general)
}

/// Build the full application with its middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{OrderingConfig, ServerConfig};

    fn test_app() -> Router {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost:1/dishdash_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:8080".to_string(),
            session_secret: SecretString::from("unused-in-router-tests"),
            ordering: OrderingConfig::default(),
            google: None,
            facebook: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://localhost:1/dishdash_test")
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_readiness_reports_unreachable_database() {
        let response = test_app()
            .oneshot(get_request("/health/ready"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_customer_routes_require_session() {
        let response = test_app().oneshot(get_request("/api/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = test_app()
            .oneshot(get_request("/api/vendor/dashboard"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unconfigured_oauth_provider_is_not_found() {
        let response = test_app()
            .oneshot(get_request("/api/auth/google/login"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
