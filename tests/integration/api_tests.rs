//! API integration tests
//!
//! These hit a running server with seeded users and a gateway sandbox; they
//! are ignored by default.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

// Seeded by the local fixture script
const OWNER_ID: &str = "11111111-1111-1111-1111-111111111111";
const RENTER_ID: &str = "22222222-2222-2222-2222-222222222222";

async fn create_test_booking(client: &Client) -> Value {
    let start = Utc::now() + Duration::days(7);
    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .header("X-User-Id", RENTER_ID)
        .json(&json!({
            "listing_id": "33333333-3333-3333-3333-333333333333",
            "owner_id": OWNER_ID,
            "start_date": start.to_rfc3339(),
            "end_date": (start + Duration::days(3)).to_rfc3339(),
            "daily_rate": "50.00",
            "include_insurance": true,
            "security_deposit": "100.00"
        }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse create response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_probes_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_create_booking() {
    let client = Client::new();
    let body = create_test_booking(&client).await;

    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["total_amount"], "187.50");
    assert!(body["booking"]["payment_intent_ref"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_create_booking_requires_identity() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_get_booking_hidden_from_strangers() {
    let client = Client::new();
    let body = create_test_booking(&client).await;
    let id = body["booking"]["id"].as_str().expect("No booking id");

    let response = client
        .get(format!("{}/bookings/{}", BASE_URL, id))
        .header("X-User-Id", "99999999-9999-9999-9999-999999999999")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_approve_then_pay_flow() {
    let client = Client::new();
    let body = create_test_booking(&client).await;
    let id = body["booking"]["id"].as_str().expect("No booking id").to_string();

    let response = client
        .post(format!("{}/bookings/{}/approve", BASE_URL, id))
        .header("X-User-Id", OWNER_ID)
        .send()
        .await
        .expect("Failed to send approve request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse approve response");
    assert_eq!(body["booking"]["status"], "payment_required");

    let response = client
        .post(format!("{}/bookings/{}/pay", BASE_URL, id))
        .header("X-User-Id", RENTER_ID)
        .send()
        .await
        .expect("Failed to send pay request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse pay response");
    assert_eq!(body["booking"]["status"], "confirmed");
    assert!(body["booking"]["charge_ref"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_reject_requires_reason() {
    let client = Client::new();
    let body = create_test_booking(&client).await;
    let id = body["booking"]["id"].as_str().expect("No booking id");

    let response = client
        .post(format!("{}/bookings/{}/reject", BASE_URL, id))
        .header("X-User-Id", OWNER_ID)
        .json(&json!({ "reason": "" }))
        .send()
        .await
        .expect("Failed to send reject request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_cancel_twice_conflicts() {
    let client = Client::new();
    let body = create_test_booking(&client).await;
    let id = body["booking"]["id"].as_str().expect("No booking id").to_string();

    let response = client
        .post(format!("{}/bookings/{}/cancel", BASE_URL, id))
        .header("X-User-Id", RENTER_ID)
        .json(&json!({ "reason": "plans changed" }))
        .send()
        .await
        .expect("Failed to send cancel request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/bookings/{}/cancel", BASE_URL, id))
        .header("X-User-Id", RENTER_ID)
        .json(&json!({ "reason": "plans changed" }))
        .send()
        .await
        .expect("Failed to send second cancel request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_confirm_pickup_wrong_status() {
    let client = Client::new();
    let body = create_test_booking(&client).await;
    let id = body["booking"]["id"].as_str().expect("No booking id");

    // Pickup confirmation is only legal once payment was captured
    let response = client
        .post(format!("{}/bookings/{}/confirm-pickup", BASE_URL, id))
        .header("X-User-Id", RENTER_ID)
        .json(&json!({ "photos": [] }))
        .send()
        .await
        .expect("Failed to send confirm request");

    assert_eq!(response.status(), 409);
}
