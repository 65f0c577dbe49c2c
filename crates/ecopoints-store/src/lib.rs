//! Ledger storage layer for EcoPoints.
//!
//! This crate owns the only shared mutable state in the system: user point
//! balances and product stock. All mutation goes through the [`LedgerStore`]
//! trait, which guarantees:
//!
//! - balances and stock never go negative; an adjustment that would cross
//!   zero is rejected as a whole
//! - the compound operations (`redeem`, `register_recycling`) are atomic:
//!   either every effect is applied or none is
//! - concurrent operations on the same user or product serialize; of two
//!   redemptions that would jointly overdraw, exactly one succeeds
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via sqlx. Row locks (`SELECT ... FOR UPDATE`)
//!   inside a transaction provide atomicity; rankings use window functions.
//! - [`MemStore`]: a single-mutex in-memory store with identical semantics,
//!   used by tests and local development.
//!
//! # Example
//!
//! ```
//! use ecopoints_core::{Product, ProductId, Store, StoreId, User, UserId};
//! use ecopoints_store::{LedgerStore, MemStore};
//!
//! # async fn demo() -> ecopoints_store::Result<()> {
//! let store = MemStore::new();
//!
//! let mut user = User::new(UserId::generate(), "Ada", "ada@example.com");
//! user.points_balance = 100;
//! store.put_user(&user).await?;
//!
//! let shop = Store::new(StoreId::generate(), "EcoMarket", "1 Green St");
//! store.put_store(&shop).await?;
//! let product = Product::new(ProductId::generate(), shop.id, "Tote bag", 30, 5);
//! store.put_product(&product).await?;
//!
//! let event = store.redeem(&user.id, &product.id, 2).await?;
//! assert_eq!(event.points_spent, 60);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use ecopoints_core::{
    ItemType, ItemTypeId, Product, ProductId, RankingSnapshot, RankingStats, RecyclingEvent,
    RecyclingStats, RedemptionEvent, RedemptionFilter, Store, StoreId, StoreRankEntry, User,
    UserId, UserRankEntry, Verification,
};

/// The storage trait defining all ledger operations.
///
/// Object-safe; the service holds an `Arc<dyn LedgerStore>` so tests can swap
/// the backend.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert or update a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_user(&self, user: &User) -> Result<()>;

    /// Get an active user by id. Inactive users read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Soft-delete a user by flipping its status to inactive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist or is already
    /// inactive.
    async fn deactivate_user(&self, user_id: &UserId) -> Result<()>;

    // =========================================================================
    // Store / Product / Item Type Operations
    // =========================================================================

    /// Insert or update a store record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_store(&self, store: &Store) -> Result<()>;

    /// Get an active store by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_store(&self, store_id: &StoreId) -> Result<Option<Store>>;

    /// List active stores, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_stores(&self) -> Result<Vec<Store>>;

    /// Insert or update a product record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the owning store doesn't exist.
    async fn put_product(&self, product: &Product) -> Result<()>;

    /// Get an active product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// List active, in-stock products of active stores, ordered by name.
    /// Optionally restricted to one store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_available_products(&self, store_id: Option<&StoreId>) -> Result<Vec<Product>>;

    /// Insert or update a recyclable item type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_item_type(&self, item_type: &ItemType) -> Result<()>;

    /// Get an active item type by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_item_type(&self, item_type_id: &ItemTypeId) -> Result<Option<ItemType>>;

    /// List active item types, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_item_types(&self) -> Result<Vec<ItemType>>;

    /// Search available products by a case-insensitive substring of their
    /// name or description, ordered by name. Same availability rules as
    /// [`list_available_products`](Self::list_available_products).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>>;

    // =========================================================================
    // Ledger Primitives
    // =========================================================================

    /// Adjust a user's points balance by `delta` (positive or negative).
    ///
    /// The check-then-apply sequence is indivisible with respect to
    /// concurrent callers on the same user. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user is absent or inactive.
    /// - `StoreError::InsufficientBalance` if the result would be negative;
    ///   in that case nothing is applied.
    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64>;

    /// Adjust a product's stock by `delta` (positive or negative).
    ///
    /// Same contract as [`adjust_balance`](Self::adjust_balance), with
    /// `StoreError::InsufficientStock` on underflow. Returns the new stock.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the product is absent or inactive.
    /// - `StoreError::InsufficientStock` if the result would be negative.
    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> Result<i64>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Exchange points for product units, all-or-nothing.
    ///
    /// Debits `cost_in_points * quantity` from the user, decrements stock by
    /// `quantity`, and records a [`RedemptionEvent`], in one atomic unit. No
    /// observer ever sees points spent with stock unchanged or vice versa.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidInput` if `quantity < 1`.
    /// - `StoreError::NotFound` if user, product, or owning store is absent
    ///   or inactive.
    /// - `StoreError::InsufficientBalance` / `StoreError::InsufficientStock`
    ///   if the ledger cannot cover the exchange. Balance and stock are left
    ///   exactly as before.
    async fn redeem(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<RedemptionEvent>;

    /// Read-only pre-flight check for [`redeem`](Self::redeem).
    ///
    /// Runs the same validation without mutating state. Business-rule
    /// violations (balance, stock) come back as a denied [`Verification`]
    /// rather than an error.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidInput` if `quantity < 1`.
    /// - `StoreError::NotFound` if user, product, or owning store is absent
    ///   or inactive.
    async fn verify_redemption(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Verification>;

    /// Credit points for a recycling deposit and record a [`RecyclingEvent`],
    /// atomically.
    ///
    /// Points are `round_half_up(weight * points_per_unit)` at the item
    /// type's current rate.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidInput` if `weight <= 0`.
    /// - `StoreError::NotFound` if user, store, or item type is absent or
    ///   inactive.
    async fn register_recycling(
        &self,
        user_id: &UserId,
        store_id: &StoreId,
        item_type_id: &ItemTypeId,
        weight: f64,
    ) -> Result<RecyclingEvent>;

    /// List a user's redemptions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_redemptions_by_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RedemptionEvent>>;

    /// List a user's recycling deposits, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_recycling_by_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>>;

    /// List a store's redemptions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_redemptions_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RedemptionEvent>>;

    /// List the recycling deposits taken at a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_recycling_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>>;

    /// Aggregate totals over all recycling deposits.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn recycling_stats(&self) -> Result<RecyclingStats>;

    // =========================================================================
    // Ranking Operations
    // =========================================================================

    /// Leaderboard of active users by points balance.
    ///
    /// Total order: balance descending, user id ascending. Ranks are 1..k
    /// with no gaps; at most `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `limit < 1`.
    async fn leaderboard_by_points(&self, limit: i64) -> Result<Vec<UserRankEntry>>;

    /// Leaderboard of active stores by points redeemed within the filter's
    /// inclusive date range.
    ///
    /// Total order: points redeemed descending, redemption count descending,
    /// store id ascending. Stores with no qualifying redemptions are omitted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `limit < 1` or the filter range
    /// is inverted.
    async fn leaderboard_by_redeemed_points(
        &self,
        limit: i64,
        filter: &RedemptionFilter,
    ) -> Result<Vec<StoreRankEntry>>;

    /// A single user's row and rank under the exact
    /// [`leaderboard_by_points`](Self::leaderboard_by_points) ordering.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user is absent or inactive.
    async fn user_rank(&self, user_id: &UserId) -> Result<UserRankEntry>;

    /// Capture the user's current balance and rank as an immutable snapshot.
    ///
    /// Append-only: calling twice records two snapshots.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user is absent or inactive.
    async fn record_history_snapshot(&self, user_id: &UserId) -> Result<RankingSnapshot>;

    /// List a user's ranking snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_snapshots_by_user(&self, user_id: &UserId) -> Result<Vec<RankingSnapshot>>;

    /// Aggregate statistics over the points leaderboard.
    ///
    /// The general figures cover active users with a positive balance; the
    /// top rows come from the same total order as
    /// [`leaderboard_by_points`](Self::leaderboard_by_points).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn ranking_stats(&self) -> Result<RankingStats>;
}

/// Guard shared by both backends: leaderboard limits must be positive.
pub(crate) fn validate_limit(limit: i64) -> Result<()> {
    if limit < 1 {
        return Err(StoreError::InvalidInput(format!(
            "limit must be at least 1, got {limit}"
        )));
    }
    Ok(())
}
