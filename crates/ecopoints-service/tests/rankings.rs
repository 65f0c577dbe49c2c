//! Ranking and snapshot integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn users_leaderboard_orders_by_balance() {
    let harness = TestHarness::new();
    harness.seed_user("bronze", 10).await;
    harness.seed_user("gold", 30).await;
    harness.seed_user("silver", 20).await;

    let response = harness.server.get("/v1/rankings/users").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "gold");
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[1]["name"], "silver");
    assert_eq!(rows[2]["name"], "bronze");
    assert_eq!(rows[2]["rank"], 3);
}

#[tokio::test]
async fn leaderboard_limit_caps_rows() {
    let harness = TestHarness::new();
    for (name, points) in [("a", 1), ("b", 2), ("c", 3)] {
        harness.seed_user(name, points).await;
    }

    let response = harness.server.get("/v1/rankings/users?limit=2").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array response").len(), 2);

    let response = harness.server.get("/v1/rankings/users?limit=0").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn user_rank_matches_leaderboard_position() {
    let harness = TestHarness::new();
    harness.seed_user("gold", 30).await;
    let silver_id = harness.seed_user("silver", 20).await;
    harness.seed_user("bronze", 10).await;

    let response = harness
        .server
        .get(&format!("/v1/rankings/users/{silver_id}"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["rank"], 2);
    assert_eq!(body["points"], 20);
    assert_eq!(body["user_id"], silver_id.to_string());
}

#[tokio::test]
async fn unknown_user_rank_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/rankings/users/00000000-0000-0000-0000-000000000000")
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn stores_leaderboard_aggregates_redemptions() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 1000).await;

    let busy = harness.seed_store("busy").await;
    let busy_product = harness.seed_product(busy, "Tote bag", 50, 10).await;
    let quiet = harness.seed_store("quiet").await;
    let quiet_product = harness.seed_product(quiet, "Sticker", 10, 10).await;
    harness.seed_store("idle").await;

    for _ in 0..2 {
        harness
            .server
            .post("/v1/redemptions")
            .json(&json!({
                "user_id": user_id.to_string(),
                "product_id": busy_product.to_string(),
            }))
            .await
            .assert_status_ok();
    }
    harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": quiet_product.to_string(),
        }))
        .await
        .assert_status_ok();

    let response = harness.server.get("/v1/rankings/stores").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    // The store without redemptions is omitted.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "busy");
    assert_eq!(rows[0]["points_redeemed"], 100);
    assert_eq!(rows[0]["redemption_count"], 2);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[1]["name"], "quiet");
    assert_eq!(rows[1]["points_redeemed"], 10);
}

#[tokio::test]
async fn stores_leaderboard_date_filter_excludes_out_of_range() {
    let harness = TestHarness::new();
    let user_id = harness.seed_user("ada", 1000).await;
    let store_id = harness.seed_store("EcoMarket").await;
    let product_id = harness.seed_product(store_id, "Tote bag", 50, 10).await;

    harness
        .server
        .post("/v1/redemptions")
        .json(&json!({
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
        }))
        .await
        .assert_status_ok();

    // A range entirely in the past excludes today's redemption.
    let response = harness
        .server
        .get("/v1/rankings/stores?date_from=2020-01-01&date_to=2020-12-31")
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array response").len(), 0);

    // An inverted range is rejected.
    let response = harness
        .server
        .get("/v1/rankings/stores?date_from=2020-12-31&date_to=2020-01-01")
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn stats_summarize_positive_balances() {
    let harness = TestHarness::new();
    harness.seed_user("bronze", 10).await;
    harness.seed_user("gold", 30).await;
    harness.seed_user("silver", 20).await;
    harness.seed_user("newcomer", 0).await;

    let response = harness.server.get("/v1/rankings/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    // Figures cover users holding points; the zero-balance user is excluded.
    assert_eq!(body["total_users"], 3);
    assert_eq!(body["max_points"], 30);
    assert_eq!(body["average_points"], 20.0);
    assert_eq!(body["median_points"], 20.0);

    // The top rows cover every active user, zero balances included.
    let top = body["top_users"].as_array().expect("array of top users");
    assert_eq!(top.len(), 4);
    assert_eq!(top[0]["name"], "gold");
    assert_eq!(top[0]["rank"], 1);
    assert_eq!(top[3]["points"], 0);
}

#[tokio::test]
async fn stats_on_an_empty_ledger_are_zero() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/rankings/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_users"], 0);
    assert_eq!(body["max_points"], 0);
    assert_eq!(body["average_points"], 0.0);
    assert_eq!(body["median_points"], 0.0);
    assert!(body["top_users"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn snapshots_are_append_only_and_list_newest_first() {
    let harness = TestHarness::new();
    harness.seed_user("gold", 30).await;
    let user_id = harness.seed_user("silver", 20).await;

    // First snapshot: rank 2 with 20 points.
    let response = harness
        .server
        .post("/v1/rankings/history")
        .json(&json!({ "user_id": user_id.to_string() }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["rank"], 2);
    assert_eq!(body["points"], 20);

    // Credit points, then snapshot again: rank 1 with 60 points.
    let store_id = harness.seed_store("EcoMarket").await;
    let item_type_id = harness.seed_item_type("aluminum", 40.0).await;
    harness
        .server
        .post("/v1/recycling")
        .json(&json!({
            "user_id": user_id.to_string(),
            "store_id": store_id.to_string(),
            "item_type_id": item_type_id.to_string(),
            "weight": 1.0,
        }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/rankings/history")
        .json(&json!({ "user_id": user_id.to_string() }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/rankings/history/{user_id}"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["points"], 60);
    assert_eq!(rows[1]["rank"], 2);
    assert_eq!(rows[1]["points"], 20);
}
