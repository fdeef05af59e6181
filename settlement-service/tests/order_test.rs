//! Order creation, listing, and the settlement state machine.

mod common;

use common::{post_order, TestApp};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;
use settlement_service::error::AppError;
use uuid::Uuid;

#[tokio::test]
async fn create_order_computes_total_and_starts_pending() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let order = post_order(
        &client,
        &app,
        "payer@x.com",
        json!([
            { "name": "Paneer Tikka", "quantity": 2, "unit_price": 150.0 },
            { "name": "Garlic Naan", "quantity": 3, "unit_price": 40.0 }
        ]),
    )
    .await;

    assert_eq!(order["status"], "PENDING");
    let total: Decimal = order["total_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, Decimal::new(42000, 2));

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Paneer Tikka");
    let subtotal: Decimal = items[0]["subtotal"].as_str().unwrap().parse().unwrap();
    assert_eq!(subtotal, Decimal::new(30000, 2));
}

#[tokio::test]
async fn create_order_rejects_unknown_payment_method() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/orders", app.address))
        .json(&json!({
            "payer_email": "payer@x.com",
            "items": [{ "name": "Veg Thali", "quantity": 1, "unit_price": 120.0 }],
            "delivery_address": "12 MG Road, Pune",
            "payment_method": "BARTER"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_order_rejects_invalid_email() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/orders", app.address))
        .json(&json!({
            "payer_email": "not-an-email",
            "items": [{ "name": "Veg Thali", "quantity": 1, "unit_price": 120.0 }],
            "delivery_address": "12 MG Road, Pune",
            "payment_method": "RAZORPAY"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn create_order_rejects_empty_items() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/orders", app.address))
        .json(&json!({
            "payer_email": "payer@x.com",
            "items": [],
            "delivery_address": "12 MG Road, Pune",
            "payment_method": "RAZORPAY"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_order_rejects_non_positive_quantity() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/orders", app.address))
        .json(&json!({
            "payer_email": "payer@x.com",
            "items": [{ "name": "Veg Thali", "quantity": 0, "unit_price": 120.0 }],
            "delivery_address": "12 MG Road, Pune",
            "payment_method": "RAZORPAY"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn list_orders_matches_payer_email_exactly() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    post_order(
        &client,
        &app,
        "a@x.com",
        json!([{ "name": "Masala Dosa", "quantity": 1, "unit_price": 90.0 }]),
    )
    .await;
    post_order(
        &client,
        &app,
        "b@x.com",
        json!([{ "name": "Idli Sambar", "quantity": 1, "unit_price": 70.0 }]),
    )
    .await;

    let listed: serde_json::Value = client
        .get(format!("{}/orders/user/a@x.com", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    let orders = listed.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["payer_email"], "a@x.com");

    // Matching is case-sensitive; a differently-cased email sees nothing.
    let listed: serde_json::Value = client
        .get(format!("{}/orders/user/A@X.com", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn settle_order_transitions_pending_to_terminal() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let order = post_order(
        &client,
        &app,
        "payer@x.com",
        json!([{ "name": "Veg Thali", "quantity": 1, "unit_price": 120.0 }]),
    )
    .await;
    let order_id: Uuid = order["order_id"].as_str().unwrap().parse().unwrap();

    let settled = app.db.settle_order(order_id, true).await.unwrap();
    assert_eq!(settled.status, "SUCCESS");

    let (stored, items) = app.db.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "SUCCESS");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn settle_order_cancels_when_not_verified() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let order = post_order(
        &client,
        &app,
        "payer@x.com",
        json!([{ "name": "Veg Thali", "quantity": 1, "unit_price": 120.0 }]),
    )
    .await;
    let order_id: Uuid = order["order_id"].as_str().unwrap().parse().unwrap();

    let cancelled = app.db.settle_order(order_id, false).await.unwrap();
    assert_eq!(cancelled.status, "CANCELLED");
}

#[tokio::test]
async fn settling_a_settled_order_is_a_conflict() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let order = post_order(
        &client,
        &app,
        "payer@x.com",
        json!([{ "name": "Veg Thali", "quantity": 1, "unit_price": 120.0 }]),
    )
    .await;
    let order_id: Uuid = order["order_id"].as_str().unwrap().parse().unwrap();

    app.db.settle_order(order_id, true).await.unwrap();

    let err = app.db.settle_order(order_id, true).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Terminal states never transition, not even to the other terminal state.
    let err = app.db.settle_order(order_id, false).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn settling_an_unknown_order_is_not_found() {
    let app = TestApp::spawn().await;

    let err = app.db.settle_order(Uuid::new_v4(), true).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
