//! In-memory ledger implementation.
//!
//! `MemStore` backs the integration tests and local development. A single
//! mutex guards all tables; every operation holds it for its whole critical
//! section, which gives the same atomicity and serialization guarantees the
//! PostgreSQL backend gets from row locks and transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use ecopoints_core::{
    recycling, redemption, DomainError, ItemType, ItemTypeId, Product, ProductId, RankingSnapshot,
    RankingStats, RecyclingEvent, RecyclingStats, RedemptionEvent, RedemptionFilter, Store,
    StoreId, StoreRankEntry, User, UserId, UserRankEntry, Verification,
};

use crate::error::{Result, StoreError};
use crate::{validate_limit, LedgerStore};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    stores: HashMap<StoreId, Store>,
    products: HashMap<ProductId, Product>,
    item_types: HashMap<ItemTypeId, ItemType>,
    recycling_events: Vec<RecyclingEvent>,
    redemption_events: Vec<RedemptionEvent>,
    snapshots: Vec<RankingSnapshot>,
}

impl Tables {
    fn active_user_rows(&self) -> Vec<(UserId, String, i64)> {
        self.users
            .values()
            .filter(|u| u.status.is_active())
            .map(|u| (u.id, u.name.clone(), u.points_balance))
            .collect()
    }
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Tables>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned mutex only means another test panicked mid-operation;
        // the tables themselves are still consistent between operations.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn page(limit: i64, offset: i64) -> (usize, usize) {
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    let offset = usize::try_from(offset.max(0)).unwrap_or(0);
    (limit, offset)
}

#[async_trait]
impl LedgerStore for MemStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn put_user(&self, user: &User) -> Result<()> {
        self.lock().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .get(user_id)
            .filter(|u| u.status.is_active())
            .cloned())
    }

    async fn deactivate_user(&self, user_id: &UserId) -> Result<()> {
        let mut tables = self.lock();
        let user = tables
            .users
            .get_mut(user_id)
            .filter(|u| u.status.is_active())
            .ok_or_else(|| not_found("user", user_id))?;
        user.status = ecopoints_core::EntityStatus::Inactive;
        Ok(())
    }

    // =========================================================================
    // Store / Product / Item Type Operations
    // =========================================================================

    async fn put_store(&self, store: &Store) -> Result<()> {
        self.lock().stores.insert(store.id, store.clone());
        Ok(())
    }

    async fn get_store(&self, store_id: &StoreId) -> Result<Option<Store>> {
        Ok(self
            .lock()
            .stores
            .get(store_id)
            .filter(|s| s.status.is_active())
            .cloned())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let mut stores: Vec<Store> = self
            .lock()
            .stores
            .values()
            .filter(|s| s.status.is_active())
            .cloned()
            .collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }

    async fn put_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.lock();
        if !tables.stores.contains_key(&product.store_id) {
            return Err(not_found("store", product.store_id));
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self
            .lock()
            .products
            .get(product_id)
            .filter(|p| p.status.is_active())
            .cloned())
    }

    async fn list_available_products(&self, store_id: Option<&StoreId>) -> Result<Vec<Product>> {
        let tables = self.lock();
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.status.is_active() && p.stock > 0)
            .filter(|p| store_id.map_or(true, |id| p.store_id == *id))
            .filter(|p| {
                tables
                    .stores
                    .get(&p.store_id)
                    .is_some_and(|s| s.status.is_active())
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let needle = query.to_lowercase();
        let tables = self.lock();
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.status.is_active() && p.stock > 0)
            .filter(|p| {
                tables
                    .stores
                    .get(&p.store_id)
                    .is_some_and(|s| s.status.is_active())
            })
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn put_item_type(&self, item_type: &ItemType) -> Result<()> {
        self.lock().item_types.insert(item_type.id, item_type.clone());
        Ok(())
    }

    async fn get_item_type(&self, item_type_id: &ItemTypeId) -> Result<Option<ItemType>> {
        Ok(self
            .lock()
            .item_types
            .get(item_type_id)
            .filter(|i| i.status.is_active())
            .cloned())
    }

    async fn list_item_types(&self) -> Result<Vec<ItemType>> {
        let mut items: Vec<ItemType> = self
            .lock()
            .item_types
            .values()
            .filter(|i| i.status.is_active())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    // =========================================================================
    // Ledger Primitives
    // =========================================================================

    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64> {
        let mut tables = self.lock();
        let user = tables
            .users
            .get_mut(user_id)
            .filter(|u| u.status.is_active())
            .ok_or_else(|| not_found("user", user_id))?;

        let new_balance = user
            .points_balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::InvalidInput("balance out of range".into()))?;
        if new_balance < 0 {
            return Err(StoreError::InsufficientBalance {
                balance: user.points_balance,
                required: delta.saturating_neg(),
            });
        }

        user.points_balance = new_balance;
        Ok(new_balance)
    }

    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> Result<i64> {
        let mut tables = self.lock();
        let product = tables
            .products
            .get_mut(product_id)
            .filter(|p| p.status.is_active())
            .ok_or_else(|| not_found("product", product_id))?;

        let new_stock = product
            .stock
            .checked_add(delta)
            .ok_or_else(|| StoreError::InvalidInput("stock out of range".into()))?;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                stock: product.stock,
                requested: delta.saturating_neg(),
            });
        }

        product.stock = new_stock;
        Ok(new_stock)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn redeem(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<RedemptionEvent> {
        let mut tables = self.lock();

        let user = tables
            .users
            .get(user_id)
            .ok_or_else(|| not_found("user", user_id))?
            .clone();
        let product = tables
            .products
            .get(product_id)
            .ok_or_else(|| not_found("product", product_id))?
            .clone();
        let store = tables
            .stores
            .get(&product.store_id)
            .ok_or_else(|| not_found("store", product.store_id))?
            .clone();

        let plan = redemption::check_redemption(&user, &store, &product, quantity)?;

        // Checks passed under the lock, so both applications succeed together.
        if let Some(u) = tables.users.get_mut(user_id) {
            u.points_balance -= plan.cost;
        }
        if let Some(p) = tables.products.get_mut(product_id) {
            p.stock -= quantity;
        }

        let event = RedemptionEvent::new(user.id, store.id, product.id, quantity, plan.cost);
        tables.redemption_events.push(event.clone());

        tracing::debug!(
            user_id = %user.id,
            product_id = %product.id,
            quantity,
            points_spent = plan.cost,
            "Redemption recorded"
        );

        Ok(event)
    }

    async fn verify_redemption(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Verification> {
        let tables = self.lock();

        let user = tables
            .users
            .get(user_id)
            .ok_or_else(|| not_found("user", user_id))?;
        let product = tables
            .products
            .get(product_id)
            .ok_or_else(|| not_found("product", product_id))?;
        let store = tables
            .stores
            .get(&product.store_id)
            .ok_or_else(|| not_found("store", product.store_id))?;

        match redemption::check_redemption(user, store, product, quantity) {
            Ok(plan) => Ok(Verification::allowed(plan.cost)),
            Err(
                err @ (DomainError::InsufficientBalance { .. }
                | DomainError::InsufficientStock { .. }),
            ) => {
                let cost =
                    redemption::redemption_cost(product.cost_in_points, quantity).unwrap_or(0);
                Ok(Verification::denied(err.to_string(), cost))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn register_recycling(
        &self,
        user_id: &UserId,
        store_id: &StoreId,
        item_type_id: &ItemTypeId,
        weight: f64,
    ) -> Result<RecyclingEvent> {
        recycling::validate_weight(weight)?;

        let mut tables = self.lock();

        let user_active = tables
            .users
            .get(user_id)
            .is_some_and(|u| u.status.is_active());
        if !user_active {
            return Err(not_found("user", user_id));
        }
        let store_active = tables
            .stores
            .get(store_id)
            .is_some_and(|s| s.status.is_active());
        if !store_active {
            return Err(not_found("store", store_id));
        }
        let item_type = tables
            .item_types
            .get(item_type_id)
            .filter(|i| i.status.is_active())
            .ok_or_else(|| not_found("item type", item_type_id))?;

        let points = recycling::points_for_weight(weight, item_type.points_per_unit)?;

        if let Some(u) = tables.users.get_mut(user_id) {
            u.points_balance = u.points_balance.saturating_add(points);
        }

        let event = RecyclingEvent::new(*user_id, *store_id, *item_type_id, weight, points);
        tables.recycling_events.push(event.clone());

        tracing::debug!(
            user_id = %user_id,
            store_id = %store_id,
            weight,
            points_awarded = points,
            "Recycling deposit recorded"
        );

        Ok(event)
    }

    async fn list_redemptions_by_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RedemptionEvent>> {
        let (limit, offset) = page(limit, offset);
        let mut events: Vec<RedemptionEvent> = self
            .lock()
            .redemption_events
            .iter()
            .filter(|e| e.user_id == *user_id)
            .cloned()
            .collect();
        // Event ids are ULIDs, so id order is chronological.
        events.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_recycling_by_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>> {
        let (limit, offset) = page(limit, offset);
        let mut events: Vec<RecyclingEvent> = self
            .lock()
            .recycling_events
            .iter()
            .filter(|e| e.user_id == *user_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_redemptions_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RedemptionEvent>> {
        let (limit, offset) = page(limit, offset);
        let mut events: Vec<RedemptionEvent> = self
            .lock()
            .redemption_events
            .iter()
            .filter(|e| e.store_id == *store_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_recycling_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>> {
        let (limit, offset) = page(limit, offset);
        let mut events: Vec<RecyclingEvent> = self
            .lock()
            .recycling_events
            .iter()
            .filter(|e| e.store_id == *store_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn recycling_stats(&self) -> Result<RecyclingStats> {
        let tables = self.lock();
        let mut stats = RecyclingStats::default();
        for event in &tables.recycling_events {
            stats.total_deposits += 1;
            stats.total_weight += event.weight;
            stats.total_points_awarded += event.points_awarded;
        }
        Ok(stats)
    }

    // =========================================================================
    // Ranking Operations
    // =========================================================================

    async fn leaderboard_by_points(&self, limit: i64) -> Result<Vec<UserRankEntry>> {
        validate_limit(limit)?;
        let rows = self.lock().active_user_rows();
        let mut ranked = ecopoints_core::ranking::rank_users(rows);
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    async fn leaderboard_by_redeemed_points(
        &self,
        limit: i64,
        filter: &RedemptionFilter,
    ) -> Result<Vec<StoreRankEntry>> {
        validate_limit(limit)?;
        filter.validate().map_err(StoreError::from)?;

        let tables = self.lock();
        let mut agg: HashMap<StoreId, (i64, i64)> = HashMap::new();
        for event in &tables.redemption_events {
            if !filter.contains(event.occurred_at) {
                continue;
            }
            let store_active = tables
                .stores
                .get(&event.store_id)
                .is_some_and(|s| s.status.is_active());
            if !store_active {
                continue;
            }
            let entry = agg.entry(event.store_id).or_insert((0, 0));
            entry.0 += event.points_spent;
            entry.1 += 1;
        }

        let rows: Vec<(StoreId, String, i64, i64)> = agg
            .into_iter()
            .filter_map(|(store_id, (sum, count))| {
                tables
                    .stores
                    .get(&store_id)
                    .map(|s| (store_id, s.name.clone(), sum, count))
            })
            .collect();

        let mut ranked = ecopoints_core::ranking::rank_stores(rows);
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    async fn user_rank(&self, user_id: &UserId) -> Result<UserRankEntry> {
        let rows = self.lock().active_user_rows();
        ecopoints_core::ranking::rank_users(rows)
            .into_iter()
            .find(|entry| entry.user_id == *user_id)
            .ok_or_else(|| not_found("user", user_id))
    }

    async fn record_history_snapshot(&self, user_id: &UserId) -> Result<RankingSnapshot> {
        let mut tables = self.lock();
        let rows = tables.active_user_rows();
        let entry = ecopoints_core::ranking::rank_users(rows)
            .into_iter()
            .find(|entry| entry.user_id == *user_id)
            .ok_or_else(|| not_found("user", user_id))?;

        let snapshot = RankingSnapshot::new(entry.user_id, entry.points, entry.rank);
        tables.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots_by_user(&self, user_id: &UserId) -> Result<Vec<RankingSnapshot>> {
        let mut snapshots: Vec<RankingSnapshot> = self
            .lock()
            .snapshots
            .iter()
            .filter(|s| s.user_id == *user_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(snapshots)
    }

    #[allow(clippy::cast_precision_loss)]
    async fn ranking_stats(&self) -> Result<RankingStats> {
        let rows = self.lock().active_user_rows();

        // General figures cover users actually holding points.
        let mut points: Vec<i64> = rows
            .iter()
            .map(|(_, _, points)| *points)
            .filter(|p| *p > 0)
            .collect();
        points.sort_unstable();

        let total_users = points.len() as i64;
        let max_points = points.last().copied().unwrap_or(0);
        let average_points = if points.is_empty() {
            0.0
        } else {
            points.iter().sum::<i64>() as f64 / points.len() as f64
        };
        let median_points = match points.len() {
            0 => 0.0,
            n if n % 2 == 1 => points[n / 2] as f64,
            n => (points[n / 2 - 1] + points[n / 2]) as f64 / 2.0,
        };

        let mut top_users = ecopoints_core::ranking::rank_users(rows);
        top_users.truncate(usize::try_from(RankingStats::TOP_LIMIT).unwrap_or(usize::MAX));

        Ok(RankingStats {
            total_users,
            max_points,
            average_points,
            median_points,
            top_users,
        })
    }
}
