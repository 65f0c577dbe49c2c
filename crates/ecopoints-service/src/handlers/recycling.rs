//! Recycling intake handlers: weigh deposits, credit points.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{ItemTypeId, RecyclingEvent, RecyclingStats, StoreId, UserId};

use crate::error::ApiError;
use crate::handlers::redemptions::HistoryQuery;
use crate::state::AppState;

/// Recycling event response.
#[derive(Debug, Serialize)]
pub struct RecyclingResponse {
    /// Event ID.
    pub id: String,
    /// User credited.
    pub user_id: String,
    /// Store where the deposit happened.
    pub store_id: String,
    /// Material deposited.
    pub item_type_id: String,
    /// Weight in kilograms.
    pub weight: f64,
    /// Points credited.
    pub points_awarded: i64,
    /// When the deposit was recorded.
    pub occurred_at: String,
}

impl From<&RecyclingEvent> for RecyclingResponse {
    fn from(event: &RecyclingEvent) -> Self {
        Self {
            id: event.id.to_string(),
            user_id: event.user_id.to_string(),
            store_id: event.store_id.to_string(),
            item_type_id: event.item_type_id.to_string(),
            weight: event.weight,
            points_awarded: event.points_awarded,
            occurred_at: event.occurred_at.to_rfc3339(),
        }
    }
}

/// Register recycling request.
#[derive(Debug, Deserialize)]
pub struct RegisterRecyclingRequest {
    /// User ID.
    pub user_id: String,
    /// Store ID where the deposit happened.
    pub store_id: String,
    /// Item type ID of the deposited material.
    pub item_type_id: String,
    /// Weight in kilograms. Must be positive.
    pub weight: f64,
}

/// Register a recycling deposit and credit points, atomically.
pub async fn register_recycling(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRecyclingRequest>,
) -> Result<Json<RecyclingResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;
    let store_id: StoreId = body
        .store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;
    let item_type_id: ItemTypeId = body
        .item_type_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid item type ID".into()))?;

    let event = state
        .store
        .register_recycling(&user_id, &store_id, &item_type_id, body.weight)
        .await?;

    tracing::info!(
        event_id = %event.id,
        user_id = %user_id,
        store_id = %store_id,
        weight = event.weight,
        points_awarded = event.points_awarded,
        "Recycling deposit registered"
    );

    Ok(Json(RecyclingResponse::from(&event)))
}

/// List a user's recycling deposits, newest first.
pub async fn list_user_recycling(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RecyclingResponse>>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;
    query.validate()?;

    let events = state
        .store
        .list_recycling_by_user(&user_id, query.limit, query.offset)
        .await?;

    Ok(Json(events.iter().map(RecyclingResponse::from).collect()))
}

/// List the deposits taken at one store, newest first.
pub async fn list_store_recycling(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RecyclingResponse>>, ApiError> {
    let store_id: StoreId = store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;
    query.validate()?;

    let events = state
        .store
        .list_recycling_by_store(&store_id, query.limit, query.offset)
        .await?;

    Ok(Json(events.iter().map(RecyclingResponse::from).collect()))
}

/// Aggregate totals across all recycling deposits.
pub async fn recycling_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecyclingStats>, ApiError> {
    let stats = state.store.recycling_stats().await?;
    Ok(Json(stats))
}
