//! Entity management integration tests: users, stores, products, item types.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn health_check_works() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_and_fetch_user() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "name": "Ada", "email": "ada@example.com" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["points_balance"], 0);
    let id = body["id"].as_str().expect("id is a string").to_string();

    let response = harness.server.get(&format!("/v1/users/{id}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], id);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn invalid_user_input_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "name": "", "email": "ada@example.com" }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "name": "Ada", "email": "not-an-email" }))
        .await;
    response.assert_status_bad_request();

    let response = harness.server.get("/v1/users/not-a-uuid").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn deactivated_user_reads_as_absent() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 50).await;

    let response = harness.server.delete(&format!("/v1/users/{user_id}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], user_id.to_string());
    assert_eq!(body["deactivated"], true);

    harness
        .server
        .get(&format!("/v1/users/{user_id}"))
        .await
        .assert_status_not_found();

    // Deactivating twice is a 404: the user already reads as absent.
    harness
        .server
        .delete(&format!("/v1/users/{user_id}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn stores_and_products_round_trip() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/stores")
        .json(&json!({ "name": "EcoMarket", "address": "1 Green St" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let store_id = body["id"].as_str().expect("id is a string").to_string();

    let response = harness
        .server
        .post("/v1/products")
        .json(&json!({
            "store_id": store_id,
            "name": "Tote bag",
            "description": "Reusable canvas bag",
            "cost_in_points": 60,
            "stock": 5,
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let product_id = body["id"].as_str().expect("id is a string").to_string();
    assert_eq!(body["cost_in_points"], 60);

    let response = harness
        .server
        .get(&format!("/v1/stores/{store_id}/products"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], product_id);

    let response = harness.server.get("/v1/stores").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array response").len(), 1);
}

#[tokio::test]
async fn product_requires_existing_store_and_valid_fields() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/products")
        .json(&json!({
            "store_id": "00000000-0000-0000-0000-000000000000",
            "name": "Tote bag",
            "cost_in_points": 60,
            "stock": 5,
        }))
        .await;
    response.assert_status_not_found();

    let store_id = harness.seed_store("EcoMarket").await;

    let response = harness
        .server
        .post("/v1/products")
        .json(&json!({
            "store_id": store_id.to_string(),
            "name": "Freebie",
            "cost_in_points": 0,
            "stock": 5,
        }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/products")
        .json(&json!({
            "store_id": store_id.to_string(),
            "name": "Tote bag",
            "cost_in_points": 60,
            "stock": -1,
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn unknown_store_products_listing_is_not_found() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/stores/00000000-0000-0000-0000-000000000000/products")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn out_of_stock_products_are_not_listed() {
    let harness = TestHarness::new();
    let store_id = harness.seed_store("EcoMarket").await;
    harness.seed_product(store_id, "Gone", 10, 0).await;
    harness.seed_product(store_id, "Left", 10, 3).await;

    let response = harness.server.get("/v1/products").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Left");
}

#[tokio::test]
async fn product_search_matches_name_and_description() {
    let harness = TestHarness::new();
    let store_id = harness.seed_store("EcoMarket").await;
    harness.seed_product(store_id, "Canvas Tote", 60, 5).await;
    harness.seed_product(store_id, "Mug", 30, 2).await;
    harness.seed_product(store_id, "Sold out tote", 10, 0).await;

    let response = harness.server.get("/v1/products/search?q=tote").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Canvas Tote");

    let response = harness.server.get("/v1/products/search?q=bamboo").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body.as_array().expect("array response").is_empty());
}

#[tokio::test]
async fn product_search_requires_a_term() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/products/search")
        .await
        .assert_status_bad_request();

    harness
        .server
        .get("/v1/products/search?q=%20")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn item_types_round_trip() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/item-types")
        .json(&json!({ "name": "aluminum", "points_per_unit": 3.5 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["points_per_unit"], 3.5);

    let response = harness
        .server
        .post("/v1/item-types")
        .json(&json!({ "name": "bad", "points_per_unit": -1.0 }))
        .await;
    response.assert_status_bad_request();

    let response = harness.server.get("/v1/item-types").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array response").len(), 1);
}
