//! Redemption integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn redeem_debits_points_and_stock() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 60, 5).await;

    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["points_spent"], 60);
    assert_eq!(body["quantity"], 1);
    assert_eq!(body["user_id"], user_id.to_string());

    assert_eq!(harness.balance_of(&user_id).await, 40);
    assert_eq!(harness.stock_of(&product_id).await, 4);
}

#[tokio::test]
async fn overdraw_is_rejected_with_402_and_nothing_changes() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 60, 5).await;

    // First redemption leaves 40 points.
    harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
        }))
        .await
        .assert_status_ok();

    // 40 < 60: the second one must fail and leave the ledger untouched.
    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
        }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["details"]["balance"], 40);
    assert_eq!(body["error"]["details"]["required"], 60);

    assert_eq!(harness.balance_of(&user_id).await, 40);
    assert_eq!(harness.stock_of(&product_id).await, 4);
}

#[tokio::test]
async fn out_of_stock_is_rejected_with_409() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 1000).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 10, 1).await;

    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
            "quantity": 2,
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_stock");

    assert_eq!(harness.balance_of(&user_id).await, 1000);
    assert_eq!(harness.stock_of(&product_id).await, 1);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 10, 5).await;

    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
            "quantity": 0,
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;

    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": "00000000-0000-0000-0000-000000000000",
        }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": "not-a-uuid",
            "product_id": "also-not-a-uuid",
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn verify_reports_denial_without_mutating() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 30).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 60, 5).await;

    let response = harness
        .server
        .post("/v1/redemptions/verify")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
        }))
        .await;

    // Business-rule denial is a 200, not an error.
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], false);
    assert_eq!(body["cost"], 60);
    assert!(body["reason"].as_str().is_some());

    assert_eq!(harness.balance_of(&user_id).await, 30);
    assert_eq!(harness.stock_of(&product_id).await, 5);
}

#[tokio::test]
async fn verify_allows_a_covered_redemption() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 30, 5).await;

    let response = harness
        .server
        .post("/v1/redemptions/verify")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
            "quantity": 2,
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["cost"], 60);
}

#[tokio::test]
async fn history_lists_newest_first_with_limit() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 100).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let cheap = harness.seed_product(store_id, "Sticker", 10, 10).await;
    let pricey = harness.seed_product(store_id, "Tote bag", 30, 10).await;

    for product_id in [cheap, pricey] {
        harness
            .server
            .post("/v1/redemptions")
            .json(&json!({
                "user_id": user_id.to_string(),
                "product_id": product_id.to_string(),
            }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get(&format!("/v1/redemptions/user/{user_id}?limit=1"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 1);
    // Newest first: the second (pricier) redemption.
    assert_eq!(rows[0]["product_id"], pricey.to_string());

    let response = harness
        .server
        .get(&format!("/v1/redemptions/user/{user_id}?limit=0"))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn store_history_covers_all_visiting_users() {
    let harness = TestHarness::new();
    let ada = harness.seed_user("ada", 100).await;
    let bob = harness.seed_user("bob", 100).await;

    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 10, 10).await;
    let other_store = harness.seed_store("Other").await;
    let other_product = harness.seed_product(other_store, "Mug", 10, 10).await;

    for (user, product) in [(ada, product_id), (bob, product_id), (ada, other_product)] {
        harness
            .server
            .post("/v1/redemptions")
            .json(&json!({
                "user_id": user.to_string(),
                "product_id": product.to_string(),
            }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get(&format!("/v1/redemptions/store/{store_id}"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    // Both users' redemptions at this store, not the one elsewhere.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["user_id"], bob.to_string());
    assert_eq!(rows[1]["user_id"], ada.to_string());

    harness
        .server
        .get("/v1/redemptions/store/not-a-uuid")
        .await
        .assert_status_bad_request();
}
