//! Integration tests for DishDash.
//!
//! The tests under `tests/` drive a running server over HTTP and are
//! ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! dd-cli migrate
//! cargo run -p dishdash-server &
//! cargo test -p dishdash-integration-tests -- --ignored --test-threads=1
//! ```
//!
//! Set `DISHDASH_TEST_URL` when the server is not on `http://localhost:8080`.
//! Every test signs up fresh accounts with random emails, so runs do not
//! interfere with each other or with existing data. Run them one at a time:
//! all requests come from one address and share its rate limit.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("DISHDASH_TEST_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// `{base_url}{path}`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// A random address on a reserved test domain.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// HTTP client with its own cookie jar, i.e. its own session.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Assert the status and return the JSON body.
///
/// # Panics
///
/// Panics on an unexpected status or a non-JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    serde_json::from_str(&body).expect("Body is not JSON")
}

/// Send a request, waiting out the auth rate limiter when it answers 429.
///
/// # Panics
///
/// Panics if the request fails or is still limited after several attempts.
pub async fn send_with_backoff<F>(build: F) -> Response
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for _ in 0..10 {
        let response = build().send().await.expect("Request failed");
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return response;
        }
        tokio::time::sleep(Duration::from_secs(6)).await;
    }
    panic!("still rate limited after 10 attempts");
}

/// A signed-in account and its session.
pub struct TestUser {
    pub client: Client,
    pub email: String,
    pub password: String,
    pub id: i64,
}

impl TestUser {
    /// Sign up a new account with `role` (`customer` or `vendor`).
    ///
    /// # Panics
    ///
    /// Panics if the server rejects the sign-up.
    pub async fn signup(role: &str) -> Self {
        let client = client();
        let email = unique_email(role);
        let password = "integration-password-1".to_string();

        let body = json!({
            "email": email,
            "password": password,
            "display_name": format!("Test {role}"),
            "role": role,
        });
        let response = send_with_backoff(|| client.post(url("/api/auth/signup")).json(&body)).await;
        let user = expect_json(response, StatusCode::CREATED).await;

        Self {
            client,
            email,
            password,
            id: user["id"].as_i64().expect("user id"),
        }
    }
}

/// A vendor with an open restaurant serving around the clock.
pub struct TestRestaurant {
    pub vendor: TestUser,
    pub id: i64,
    /// Menu item ids in creation order.
    pub items: Vec<i64>,
}

impl TestRestaurant {
    /// Create a vendor, a restaurant and one menu item per `(name, price)`.
    ///
    /// # Panics
    ///
    /// Panics if any request fails.
    pub async fn create(minimum_order: &str, items: &[(&str, &str)]) -> Self {
        let vendor = TestUser::signup("vendor").await;

        let response = vendor
            .client
            .put(url("/api/vendor/restaurant"))
            .json(&json!({
                "name": format!("Test Kitchen {}", Uuid::new_v4().simple()),
                "cuisine": "testing",
                "address": "1 Integration Way",
                "opens_at": "00:00:00",
                "closes_at": "00:00:00",
                "delivery_fee": "3.00",
                "free_delivery_threshold": "50.00",
                "minimum_order": minimum_order,
                "discount_percent": "10",
            }))
            .send()
            .await
            .expect("Restaurant request failed");
        let restaurant = expect_json(response, StatusCode::OK).await;

        let mut ids = Vec::with_capacity(items.len());
        for (name, price) in items {
            let response = vendor
                .client
                .post(url("/api/vendor/menu"))
                .json(&json!({ "name": name, "price": price, "category": "Mains" }))
                .send()
                .await
                .expect("Menu request failed");
            let item = expect_json(response, StatusCode::CREATED).await;
            ids.push(item["id"].as_i64().expect("item id"));
        }

        Self {
            id: restaurant["id"].as_i64().expect("restaurant id"),
            vendor,
            items: ids,
        }
    }

    /// Start of the first offered delivery slot, today or tomorrow.
    ///
    /// # Panics
    ///
    /// Panics if no slot is offered on either day.
    pub async fn first_slot(&self, client: &Client) -> String {
        let today = self.slots(client, None).await;
        if let Some(start) = first_start(&today) {
            return start;
        }

        let date: NaiveDate = today["date"]
            .as_str()
            .and_then(|d| d.parse().ok())
            .expect("slot listing date");
        let tomorrow = date.checked_add_days(Days::new(1)).expect("valid date");
        let next = self.slots(client, Some(tomorrow)).await;
        first_start(&next).expect("restaurant offers slots tomorrow")
    }

    async fn slots(&self, client: &Client, date: Option<NaiveDate>) -> Value {
        let mut path = format!("/api/restaurants/{}/delivery-slots", self.id);
        if let Some(date) = date {
            path.push_str(&format!("?date={date}"));
        }
        let response = client.get(url(&path)).send().await.expect("Slot request failed");
        expect_json(response, StatusCode::OK).await
    }
}

fn first_start(listing: &Value) -> Option<String> {
    listing["slots"]
        .as_array()?
        .first()?
        .get("start")?
        .as_str()
        .map(String::from)
}
