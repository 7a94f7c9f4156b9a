//! Vendor back office: restaurant setup, menu, order handling, reviews and
//! the dashboard.
//!
//! These tests require a migrated database and a running server.
//! Run with: cargo test -p dishdash-integration-tests -- --ignored --test-threads=1

use dishdash_integration_tests::{TestRestaurant, TestUser, client, expect_json, url};
use reqwest::StatusCode;
use serde_json::{Value, json};

/// Place an order for one of each item and return its id.
async fn place_order(restaurant: &TestRestaurant, customer: &TestUser) -> i64 {
    for item in &restaurant.items {
        let resp = customer
            .client
            .post(url("/api/cart/items"))
            .json(&json!({ "menu_item_id": item }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let slot = restaurant.first_slot(&customer.client).await;
    let resp = customer
        .client
        .post(url("/api/checkout"))
        .json(&json!({
            "delivery_address": "9 Vendor Road",
            "slot_start": slot,
            "payment_method": "cash",
        }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap()
}

async fn set_status(restaurant: &TestRestaurant, order_id: i64, status: &str) -> StatusCode {
    restaurant
        .vendor
        .client
        .post(url(&format!("/api/vendor/orders/{order_id}/status")))
        .json(&json!({ "status": status }))
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_vendor_routes_reject_customers() {
    let customer = TestUser::signup("customer").await;
    let resp = customer
        .client
        .get(url("/api/vendor/restaurant"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let vendor = TestUser::signup("vendor").await;
    let resp = vendor
        .client
        .get(url("/api/vendor/restaurant"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_menu_management() {
    let restaurant = TestRestaurant::create("0", &[("Pad Thai", "11.00")]).await;
    let vendor = &restaurant.vendor.client;

    let resp = vendor
        .post(url("/api/vendor/menu"))
        .json(&json!({ "name": "Pad Thai", "price": "12.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = vendor
        .post(url("/api/vendor/menu"))
        .json(&json!({ "name": "Free Water", "price": "0" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let item_id = restaurant.items[0];
    let resp = vendor
        .patch(url(&format!("/api/vendor/menu/{item_id}")))
        .json(&json!({ "is_available": false }))
        .send()
        .await
        .unwrap();
    let item = expect_json(resp, StatusCode::OK).await;
    assert_eq!(item["is_available"], false);

    // Unavailable items disappear from the public menu
    let menu = expect_json(
        client()
            .get(url(&format!("/api/restaurants/{}/menu", restaurant.id)))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert!(menu.as_array().unwrap().is_empty());

    let resp = vendor
        .delete(url(&format!("/api/vendor/menu/{item_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_lifecycle_review_and_dashboard() {
    let restaurant = TestRestaurant::create("0", &[("Ramen", "14.00")]).await;
    let customer = TestUser::signup("customer").await;
    let order_id = place_order(&restaurant, &customer).await;

    let incoming = expect_json(
        restaurant
            .vendor
            .client
            .get(url("/api/vendor/orders?status=placed"))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(incoming.as_array().unwrap().len(), 1);

    // Skipping a step and cancelling on the customer's behalf are refused
    assert_eq!(set_status(&restaurant, order_id, "delivered").await, StatusCode::CONFLICT);
    assert_eq!(set_status(&restaurant, order_id, "cancelled").await, StatusCode::FORBIDDEN);

    for status in ["accepted", "preparing", "out_for_delivery", "delivered"] {
        assert_eq!(set_status(&restaurant, order_id, status).await, StatusCode::OK);
    }

    // Ordered items can no longer be deleted
    let resp = restaurant
        .vendor
        .client
        .delete(url(&format!("/api/vendor/menu/{}", restaurant.items[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let review_url = url(&format!("/api/orders/{order_id}/review"));
    let resp = customer
        .client
        .post(&review_url)
        .json(&json!({ "rating": 4, "comment": "Great broth" }))
        .send()
        .await
        .unwrap();
    let review = expect_json(resp, StatusCode::CREATED).await;

    let resp = customer
        .client
        .post(&review_url)
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = restaurant
        .vendor
        .client
        .post(url(&format!("/api/vendor/reviews/{}/reply", review["id"])))
        .json(&json!({ "reply": "Thank you!" }))
        .send()
        .await
        .unwrap();
    let replied = expect_json(resp, StatusCode::OK).await;
    assert_eq!(replied["vendor_reply"], "Thank you!");

    let public: Value = expect_json(
        client()
            .get(url(&format!("/api/restaurants/{}/reviews", restaurant.id)))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(public["summary"]["count"], 1);

    let dashboard = expect_json(
        restaurant
            .vendor
            .client
            .get(url("/api/vendor/dashboard?window=all"))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(dashboard["total_orders"], 1);
    assert_eq!(dashboard["orders_by_status"]["delivered"], 1);
    assert_eq!(dashboard["top_item"]["name"], "Ramen");
    assert_eq!(dashboard["rating"]["count"], 1);

    let resp = restaurant
        .vendor
        .client
        .get(url("/api/vendor/dashboard?window=fortnight"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
