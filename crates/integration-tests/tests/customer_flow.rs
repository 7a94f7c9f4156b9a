//! Customer journey: sign-up, cart, checkout, cancellation and reviews.
//!
//! These tests require a migrated database and a running server.
//! Run with: cargo test -p dishdash-integration-tests -- --ignored --test-threads=1

use dishdash_integration_tests::{
    TestRestaurant, TestUser, client, expect_json, send_with_backoff, unique_email, url,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health & Auth
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_endpoints() {
    let client = client();

    let resp = client.get(url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = client.get(url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_signup_login_logout() {
    let user = TestUser::signup("customer").await;

    let me = expect_json(
        user.client.get(url("/api/auth/me")).send().await.unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(me["email"], user.email.as_str());
    assert_eq!(me["role"], "customer");

    let resp = user.client.post(url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = user.client.get(url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let wrong = json!({ "email": user.email, "password": "not-the-password" });
    let resp = send_with_backoff(|| user.client.post(url("/api/auth/login")).json(&wrong)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let right = json!({ "email": user.email.to_uppercase(), "password": user.password });
    let resp = send_with_backoff(|| user.client.post(url("/api/auth/login")).json(&right)).await;
    let me = expect_json(resp, StatusCode::OK).await;
    assert_eq!(me["id"], user.id);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_signup_conflicts() {
    let user = TestUser::signup("customer").await;
    let other = client();
    let body = json!({
        "email": user.email,
        "password": "another-password",
        "display_name": "Someone Else",
    });

    let resp = send_with_backoff(|| other.post(url("/api/auth/signup")).json(&body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let weak = json!({
        "email": unique_email("weak"),
        "password": "short",
        "display_name": "Weak",
    });
    let resp = send_with_backoff(|| other.post(url("/api/auth/signup")).json(&weak)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_is_single_restaurant() {
    let first = TestRestaurant::create("0", &[("Dumplings", "8.00")]).await;
    let second = TestRestaurant::create("0", &[("Tacos", "6.00")]).await;
    let customer = TestUser::signup("customer").await;

    let resp = customer
        .client
        .post(url("/api/cart/items"))
        .json(&json!({ "menu_item_id": first.items[0], "quantity": 2 }))
        .send()
        .await
        .unwrap();
    let cart = expect_json(resp, StatusCode::OK).await;
    assert_eq!(cart["restaurant"]["id"], first.id);
    assert_eq!(cart["totals"]["subtotal"], "16.00");

    let resp = customer
        .client
        .post(url("/api/cart/items"))
        .json(&json!({ "menu_item_id": second.items[0] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = customer
        .client
        .post(url("/api/cart/items"))
        .json(&json!({ "menu_item_id": second.items[0], "replace_cart": true }))
        .send()
        .await
        .unwrap();
    let cart = expect_json(resp, StatusCode::OK).await;
    assert_eq!(cart["restaurant"]["id"], second.id);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);

    // Zero removes the line
    let resp = customer
        .client
        .patch(url(&format!("/api/cart/items/{}", second.items[0])))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    let cart = expect_json(resp, StatusCode::OK).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
    assert_eq!(cart["totals"]["total"], "0");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_vendor_cannot_use_cart() {
    let vendor = TestUser::signup("vendor").await;
    let resp = vendor.client.get(url("/api/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Checkout & Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_minimum_order_blocks_checkout() {
    let restaurant = TestRestaurant::create("20.00", &[("Soup", "5.00")]).await;
    let customer = TestUser::signup("customer").await;

    customer
        .client
        .post(url("/api/cart/items"))
        .json(&json!({ "menu_item_id": restaurant.items[0] }))
        .send()
        .await
        .unwrap();

    let resp = customer
        .client
        .post(url("/api/checkout/quote"))
        .send()
        .await
        .unwrap();
    let quote = expect_json(resp, StatusCode::OK).await;
    assert_eq!(quote["ready"], false);
    assert_eq!(quote["totals"]["meets_minimum"], false);

    let slot = restaurant.first_slot(&customer.client).await;
    let resp = customer
        .client
        .post(url("/api/checkout"))
        .json(&json!({
            "delivery_address": "5 Test Lane",
            "slot_start": slot,
            "payment_method": "cash",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_checkout_cancel_and_review() {
    let restaurant = TestRestaurant::create("10.00", &[("Curry", "12.00"), ("Naan", "3.00")]).await;
    let customer = TestUser::signup("customer").await;

    for (item, quantity) in [(restaurant.items[0], 2), (restaurant.items[1], 1)] {
        let resp = customer
            .client
            .post(url("/api/cart/items"))
            .json(&json!({ "menu_item_id": item, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let slot = restaurant.first_slot(&customer.client).await;
    let checkout = json!({
        "delivery_address": "5 Test Lane",
        "slot_start": slot,
        "payment_method": "card",
        "notes": "Ring twice",
    });

    let resp = customer
        .client
        .post(url("/api/checkout"))
        .json(&checkout)
        .send()
        .await
        .unwrap();
    let order = expect_json(resp, StatusCode::CREATED).await;
    // 27.00 - 10% = 24.30, plus 3.00 delivery, plus tax on 24.30
    assert_eq!(order["subtotal"], "27.00");
    assert_eq!(order["discount"], "2.70");
    assert_eq!(order["status"], "placed");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    // Cart is emptied by checkout
    let cart = expect_json(
        customer.client.get(url("/api/cart")).send().await.unwrap(),
        StatusCode::OK,
    )
    .await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let order_id = order["id"].as_i64().unwrap();

    // Not delivered yet
    let resp = customer
        .client
        .post(url(&format!("/api/orders/{order_id}/review")))
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Another customer cannot see it
    let stranger = TestUser::signup("customer").await;
    let resp = stranger
        .client
        .get(url(&format!("/api/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = customer
        .client
        .post(url(&format!("/api/orders/{order_id}/cancel")))
        .send()
        .await
        .unwrap();
    let cancelled = expect_json(resp, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "cancelled");

    let resp = customer
        .client
        .post(url(&format!("/api/orders/{order_id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let history = expect_json(
        customer.client.get(url("/api/orders")).send().await.unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}
