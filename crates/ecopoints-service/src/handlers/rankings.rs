//! Ranking handlers: leaderboards and snapshot history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ecopoints_core::{
    RankingSnapshot, RankingStats, RedemptionFilter, StoreRankEntry, UserId, UserRankEntry,
};

use crate::error::ApiError;
use crate::handlers::redemptions::default_limit;
use crate::state::AppState;

/// User leaderboard row response.
#[derive(Debug, Serialize)]
pub struct UserRankResponse {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Points balance.
    pub points: i64,
    /// 1-based rank.
    pub rank: i64,
}

impl From<&UserRankEntry> for UserRankResponse {
    fn from(entry: &UserRankEntry) -> Self {
        Self {
            user_id: entry.user_id.to_string(),
            name: entry.name.clone(),
            points: entry.points,
            rank: entry.rank,
        }
    }
}

/// Store leaderboard row response.
#[derive(Debug, Serialize)]
pub struct StoreRankResponse {
    /// Store ID.
    pub store_id: String,
    /// Store name.
    pub name: String,
    /// Points redeemed within the date range.
    pub points_redeemed: i64,
    /// Number of redemptions within the date range.
    pub redemption_count: i64,
    /// 1-based rank.
    pub rank: i64,
}

impl From<&StoreRankEntry> for StoreRankResponse {
    fn from(entry: &StoreRankEntry) -> Self {
        Self {
            store_id: entry.store_id.to_string(),
            name: entry.name.clone(),
            points_redeemed: entry.points_redeemed,
            redemption_count: entry.redemption_count,
            rank: entry.rank,
        }
    }
}

/// Ranking snapshot response.
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    /// Snapshot ID.
    pub id: String,
    /// User the snapshot belongs to.
    pub user_id: String,
    /// Points balance at capture time.
    pub points: i64,
    /// Rank at capture time.
    pub rank: i64,
    /// When the snapshot was taken.
    pub recorded_at: String,
}

impl From<&RankingSnapshot> for SnapshotResponse {
    fn from(snapshot: &RankingSnapshot) -> Self {
        Self {
            id: snapshot.id.to_string(),
            user_id: snapshot.user_id.to_string(),
            points: snapshot.points,
            rank: snapshot.rank,
            recorded_at: snapshot.recorded_at.to_rfc3339(),
        }
    }
}

/// Query parameters for the user leaderboard.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Maximum rows to return. Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for the store leaderboard.
#[derive(Debug, Deserialize)]
pub struct StoreLeaderboardQuery {
    /// Maximum rows to return. Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// First day included (YYYY-MM-DD), if any.
    pub date_from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD), if any.
    pub date_to: Option<NaiveDate>,
}

/// Active users ranked by points balance.
pub async fn users_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<UserRankResponse>>, ApiError> {
    let entries = state.store.leaderboard_by_points(query.limit).await?;
    Ok(Json(entries.iter().map(UserRankResponse::from).collect()))
}

/// One user's current row and rank in the points leaderboard.
pub async fn user_rank(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRankResponse>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let entry = state.store.user_rank(&user_id).await?;
    Ok(Json(UserRankResponse::from(&entry)))
}

/// Active stores ranked by points redeemed within an optional date range.
pub async fn stores_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreLeaderboardQuery>,
) -> Result<Json<Vec<StoreRankResponse>>, ApiError> {
    let filter = RedemptionFilter {
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let entries = state
        .store
        .leaderboard_by_redeemed_points(query.limit, &filter)
        .await?;

    Ok(Json(entries.iter().map(StoreRankResponse::from).collect()))
}

/// Ranking statistics response.
#[derive(Debug, Serialize)]
pub struct RankingStatsResponse {
    /// Active users holding a positive balance.
    pub total_users: i64,
    /// Highest balance among them.
    pub max_points: i64,
    /// Mean balance among them.
    pub average_points: f64,
    /// Median balance among them.
    pub median_points: f64,
    /// Top rows of the current leaderboard.
    pub top_users: Vec<UserRankResponse>,
}

impl From<&RankingStats> for RankingStatsResponse {
    fn from(stats: &RankingStats) -> Self {
        Self {
            total_users: stats.total_users,
            max_points: stats.max_points,
            average_points: stats.average_points,
            median_points: stats.median_points,
            top_users: stats.top_users.iter().map(UserRankResponse::from).collect(),
        }
    }
}

/// Summary statistics over the points leaderboard.
pub async fn ranking_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RankingStatsResponse>, ApiError> {
    let stats = state.store.ranking_stats().await?;
    Ok(Json(RankingStatsResponse::from(&stats)))
}

/// Record snapshot request.
#[derive(Debug, Deserialize)]
pub struct RecordSnapshotRequest {
    /// User ID to snapshot.
    pub user_id: String,
}

/// Capture a user's current balance and rank as an immutable snapshot.
pub async fn record_history_snapshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecordSnapshotRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let snapshot = state.store.record_history_snapshot(&user_id).await?;

    tracing::info!(
        snapshot_id = %snapshot.id,
        user_id = %user_id,
        rank = snapshot.rank,
        "Ranking snapshot recorded"
    );

    Ok(Json(SnapshotResponse::from(&snapshot)))
}

/// List a user's ranking snapshots, newest first.
pub async fn list_user_snapshots(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<SnapshotResponse>>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let snapshots = state.store.list_snapshots_by_user(&user_id).await?;
    Ok(Json(snapshots.iter().map(SnapshotResponse::from).collect()))
}
