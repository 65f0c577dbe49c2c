//! Immutable event records produced by the ledger.
//!
//! Events are append-only: once written they are never mutated, and the
//! amounts they carry are fixed at transaction time regardless of later
//! price or rate changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, ItemTypeId, ProductId, StoreId, UserId};

/// A weighed deposit of recyclable material, credited with points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecyclingEvent {
    /// Event identifier (time-ordered).
    pub id: EventId,
    /// User credited.
    pub user_id: UserId,
    /// Store where the deposit happened.
    pub store_id: StoreId,
    /// Material deposited.
    pub item_type_id: ItemTypeId,
    /// Weight in kilograms.
    pub weight: f64,
    /// Points credited: `round_half_up(weight * points_per_unit)` at the time
    /// of the deposit.
    pub points_awarded: i64,
    /// When the deposit was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl RecyclingEvent {
    /// Create a new recycling event record.
    #[must_use]
    pub fn new(
        user_id: UserId,
        store_id: StoreId,
        item_type_id: ItemTypeId,
        weight: f64,
        points_awarded: i64,
    ) -> Self {
        Self {
            id: EventId::generate(),
            user_id,
            store_id,
            item_type_id,
            weight,
            points_awarded,
            occurred_at: Utc::now(),
        }
    }
}

/// An exchange of points for product units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionEvent {
    /// Event identifier (time-ordered).
    pub id: EventId,
    /// User debited.
    pub user_id: UserId,
    /// Store owning the product.
    pub store_id: StoreId,
    /// Product redeemed.
    pub product_id: ProductId,
    /// Units redeemed. At least 1.
    pub quantity: i64,
    /// Points debited: `cost_in_points * quantity` at transaction time,
    /// permanently fixed even if the price later changes.
    pub points_spent: i64,
    /// When the redemption was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl RedemptionEvent {
    /// Create a new redemption event record.
    #[must_use]
    pub fn new(
        user_id: UserId,
        store_id: StoreId,
        product_id: ProductId,
        quantity: i64,
        points_spent: i64,
    ) -> Self {
        Self {
            id: EventId::generate(),
            user_id,
            store_id,
            product_id,
            quantity,
            points_spent,
            occurred_at: Utc::now(),
        }
    }
}

/// A user's balance and rank captured at a point in time.
///
/// Snapshots form an append-only log: recording twice yields two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSnapshot {
    /// Snapshot identifier (time-ordered).
    pub id: EventId,
    /// User the snapshot belongs to.
    pub user_id: UserId,
    /// Points balance at capture time.
    pub points: i64,
    /// 1-based rank at capture time, under the leaderboard total order.
    pub rank: i64,
    /// When the snapshot was taken.
    pub recorded_at: DateTime<Utc>,
}

impl RankingSnapshot {
    /// Create a new snapshot record.
    #[must_use]
    pub fn new(user_id: UserId, points: i64, rank: i64) -> Self {
        Self {
            id: EventId::generate(),
            user_id,
            points,
            rank,
            recorded_at: Utc::now(),
        }
    }
}
