//! Leaderboard ordering and rank assignment.
//!
//! Ranking is a total order. Ties on the primary metric are always broken by
//! a fixed secondary key (entity id ascending), so two calls over the same
//! data produce the same ranks. Ranks are 1-based positions in that order:
//! no gaps, no shared ranks.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::ids::{StoreId, UserId};

/// A user's row in the points leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRankEntry {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Current points balance.
    pub points: i64,
    /// 1-based position.
    pub rank: i64,
}

/// A store's row in the redeemed-points leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRankEntry {
    /// Store identifier.
    pub store_id: StoreId,
    /// Store name.
    pub name: String,
    /// Sum of points spent at this store within the filter range.
    pub points_redeemed: i64,
    /// Number of redemptions within the filter range.
    pub redemption_count: i64,
    /// 1-based position.
    pub rank: i64,
}

/// Aggregate statistics over the points leaderboard.
///
/// The general figures cover active users holding at least one point; the
/// top entries use the full leaderboard order, so they match
/// what a leaderboard query with a limit of [`RankingStats::TOP_LIMIT`]
/// returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingStats {
    /// Active users with a positive balance.
    pub total_users: i64,
    /// Highest balance among them, 0 when there are none.
    pub max_points: i64,
    /// Mean balance among them, 0 when there are none.
    pub average_points: f64,
    /// Median balance among them, 0 when there are none.
    pub median_points: f64,
    /// The leaderboard's top rows.
    pub top_users: Vec<UserRankEntry>,
}

impl RankingStats {
    /// Number of leaderboard rows carried in [`RankingStats::top_users`].
    pub const TOP_LIMIT: i64 = 10;
}

/// Validated date-range criteria for the store leaderboard.
///
/// Both bounds are optional and inclusive, interpreted as whole UTC days.
/// Built explicitly rather than assembled into a WHERE string: the storage
/// layer binds the resolved timestamps as query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionFilter {
    /// First day included, if any.
    pub date_from: Option<NaiveDate>,
    /// Last day included, if any.
    pub date_to: Option<NaiveDate>,
}

impl RedemptionFilter {
    /// Check that the bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDateRange`] if `date_from > date_to`.
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(DomainError::InvalidDateRange { from, to });
            }
        }
        Ok(())
    }

    /// Inclusive lower timestamp bound: midnight UTC of `date_from`.
    #[must_use]
    pub fn start_bound(&self) -> Option<DateTime<Utc>> {
        self.date_from.map(day_start)
    }

    /// Exclusive upper timestamp bound: midnight UTC of the day after
    /// `date_to`, so an event at any time on `date_to` itself is included.
    #[must_use]
    pub fn end_bound(&self) -> Option<DateTime<Utc>> {
        self.date_to
            .and_then(|to| to.checked_add_days(Days::new(1)))
            .map(day_start)
    }

    /// Whether a timestamp falls inside the range.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_bound() {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end_bound() {
            if at >= end {
                return false;
            }
        }
        true
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Order user rows and assign ranks.
///
/// Order: points descending, then user id ascending. Input rows are
/// `(user_id, name, points)`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn rank_users(mut rows: Vec<(UserId, String, i64)>) -> Vec<UserRankEntry> {
    rows.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    rows.into_iter()
        .enumerate()
        .map(|(i, (user_id, name, points))| UserRankEntry {
            user_id,
            name,
            points,
            rank: i as i64 + 1,
        })
        .collect()
}

/// Order store aggregate rows and assign ranks.
///
/// Order: points redeemed descending, then redemption count descending, then
/// store id ascending. Input rows are `(store_id, name, points_redeemed,
/// redemption_count)`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn rank_stores(mut rows: Vec<(StoreId, String, i64, i64)>) -> Vec<StoreRankEntry> {
    rows.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| b.3.cmp(&a.3))
            .then_with(|| a.0.cmp(&b.0))
    });

    rows.into_iter()
        .enumerate()
        .map(
            |(i, (store_id, name, points_redeemed, redemption_count))| StoreRankEntry {
                store_id,
                name,
                points_redeemed,
                redemption_count,
                rank: i as i64 + 1,
            },
        )
        .collect()
}
