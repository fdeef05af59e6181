//! Payment intent and verification flows in mock gateway mode.

mod common;

use common::{fetch_payment_records, post_order, TestApp};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;

fn body_amount(body: &serde_json::Value) -> Decimal {
    body["amount"]
        .as_str()
        .expect("amount should be a decimal string")
        .parse()
        .expect("amount should parse")
}

#[tokio::test]
async fn create_order_rejects_zero_amount() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/create-order", app.address))
        .json(&json!({ "amount": 0 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Amount must be greater than 0");
}

#[tokio::test]
async fn create_order_rejects_missing_amount() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/create-order", app.address))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Amount must be greater than 0");
}

#[tokio::test]
async fn create_order_in_mock_mode_returns_synthetic_intent() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/create-order", app.address))
        .json(&json!({ "amount": 250.0 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");

    let order_id = body["order_id"].as_str().unwrap();
    assert!(order_id.starts_with("order_mock_"));
    assert_eq!(body_amount(&body), Decimal::new(25000, 2));
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["status"], "created");
}

#[tokio::test]
async fn create_order_honors_explicit_currency() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/create-order", app.address))
        .json(&json!({ "amount": 100.0, "currency": "USD" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["currency"], "USD");
}

#[tokio::test]
async fn verify_in_mock_mode_records_success() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/verify", app.address))
        .json(&json!({
            "gateway_order_id": "order_mock_1",
            "gateway_payment_id": "pay_abc",
            "signature": "any-signature-at-all",
            "email": "a@x.com",
            "amount": 250.0
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["verified"], true);
    assert_eq!(body["status"], "SUCCESS");

    let records = fetch_payment_records(&app, "order_mock_1").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, "SUCCESS");
    // The ledger keeps the submitted signature byte for byte.
    assert_eq!(records[0].signature, "any-signature-at-all");
    assert_eq!(records[0].payer_email, "a@x.com");
}

#[tokio::test]
async fn duplicate_verify_reuses_the_first_outcome() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let payload = json!({
        "gateway_order_id": "order_mock_2",
        "gateway_payment_id": "pay_dup",
        "signature": "sig",
        "email": "a@x.com",
        "amount": 100.0
    });

    let first = client
        .post(format!("{}/payments/verify", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(first.status(), 200);

    let second = client
        .post(format!("{}/payments/verify", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(second.status(), 200);

    let records = fetch_payment_records(&app, "order_mock_2").await;
    assert_eq!(records.len(), 1, "duplicate callback must not add a row");
}

#[tokio::test]
async fn verify_settles_the_matching_pending_order() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let order = post_order(
        &client,
        &app,
        "payer@x.com",
        json!([{ "name": "Veg Thali", "quantity": 2, "unit_price": 125.0 }]),
    )
    .await;
    assert_eq!(order["status"], "PENDING");

    let response = client
        .post(format!("{}/payments/verify", app.address))
        .json(&json!({
            "gateway_order_id": "order_mock_3",
            "gateway_payment_id": "pay_settle",
            "signature": "sig",
            "email": "payer@x.com",
            "amount": 250.0
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let listed: serde_json::Value = client
        .get(format!("{}/orders/user/payer@x.com", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["status"], "SUCCESS");
}

#[tokio::test]
async fn verify_rejects_missing_fields_without_writing() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/verify", app.address))
        .json(&json!({
            "gateway_order_id": "order_mock_4",
            "gateway_payment_id": "pay_empty",
            "signature": "",
            "email": "a@x.com",
            "amount": 100.0
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);

    let records = fetch_payment_records(&app, "order_mock_4").await;
    assert!(records.is_empty());
}
