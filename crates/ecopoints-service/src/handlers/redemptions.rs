//! Redemption handlers: spend points on products.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{ProductId, RedemptionEvent, StoreId, UserId, Verification};

use crate::error::ApiError;
use crate::state::AppState;

/// Redemption event response.
#[derive(Debug, Serialize)]
pub struct RedemptionResponse {
    /// Event ID.
    pub id: String,
    /// User debited.
    pub user_id: String,
    /// Store owning the product.
    pub store_id: String,
    /// Product redeemed.
    pub product_id: String,
    /// Units redeemed.
    pub quantity: i64,
    /// Points debited.
    pub points_spent: i64,
    /// When the redemption happened.
    pub occurred_at: String,
}

impl From<&RedemptionEvent> for RedemptionResponse {
    fn from(event: &RedemptionEvent) -> Self {
        Self {
            id: event.id.to_string(),
            user_id: event.user_id.to_string(),
            store_id: event.store_id.to_string(),
            product_id: event.product_id.to_string(),
            quantity: event.quantity,
            points_spent: event.points_spent,
            occurred_at: event.occurred_at.to_rfc3339(),
        }
    }
}

/// Redemption request, shared by redeem and verify.
#[derive(Debug, Deserialize)]
pub struct RedemptionRequest {
    /// User ID.
    pub user_id: String,
    /// Product ID.
    pub product_id: String,
    /// Units to redeem. Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

impl RedemptionRequest {
    fn parse_ids(&self) -> Result<(UserId, ProductId), ApiError> {
        let user_id = self
            .user_id
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;
        let product_id = self
            .product_id
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid product ID".into()))?;
        Ok((user_id, product_id))
    }
}

/// Exchange points for product units, atomically.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RedemptionRequest>,
) -> Result<Json<RedemptionResponse>, ApiError> {
    let (user_id, product_id) = body.parse_ids()?;

    let event = state
        .store
        .redeem(&user_id, &product_id, body.quantity)
        .await?;

    tracing::info!(
        event_id = %event.id,
        user_id = %user_id,
        product_id = %product_id,
        quantity = event.quantity,
        points_spent = event.points_spent,
        "Redemption completed"
    );

    Ok(Json(RedemptionResponse::from(&event)))
}

/// Pre-flight check: would this redemption succeed right now?
///
/// Business-rule denials (balance, stock) come back as a 200 with
/// `allowed: false`; only absent entities and malformed input are errors.
pub async fn verify_redemption(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RedemptionRequest>,
) -> Result<Json<Verification>, ApiError> {
    let (user_id, product_id) = body.parse_ids()?;

    let verification = state
        .store
        .verify_redemption(&user_id, &product_id, body.quantity)
        .await?;

    Ok(Json(verification))
}

/// Pagination parameters for history listings.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum rows to return. Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Rows to skip. Defaults to 0.
    #[serde(default)]
    pub offset: i64,
}

pub(crate) const fn default_limit() -> i64 {
    50
}

impl HistoryQuery {
    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.limit < 1 {
            return Err(ApiError::BadRequest("Limit must be at least 1".into()));
        }
        if self.offset < 0 {
            return Err(ApiError::BadRequest("Offset must not be negative".into()));
        }
        Ok(())
    }
}

/// List a user's redemptions, newest first.
pub async fn list_user_redemptions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RedemptionResponse>>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;
    query.validate()?;

    let events = state
        .store
        .list_redemptions_by_user(&user_id, query.limit, query.offset)
        .await?;

    Ok(Json(events.iter().map(RedemptionResponse::from).collect()))
}

/// List the redemptions taken at one store, newest first.
pub async fn list_store_redemptions(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RedemptionResponse>>, ApiError> {
    let store_id: StoreId = store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;
    query.validate()?;

    let events = state
        .store
        .list_redemptions_by_store(&store_id, query.limit, query.offset)
        .await?;

    Ok(Json(events.iter().map(RedemptionResponse::from).collect()))
}
