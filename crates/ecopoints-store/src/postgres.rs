//! PostgreSQL ledger implementation.
//!
//! All compound operations run inside a transaction. `redeem` and
//! `register_recycling` take `SELECT ... FOR UPDATE` row locks so concurrent
//! operations against the same user or product serialize; dropping the
//! transaction on any error path rolls everything back. Rankings are
//! computed with `ROW_NUMBER()` window functions using the same total order
//! on every operation.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use ecopoints_core::{
    recycling, redemption, DomainError, EntityStatus, EventId, ItemType, ItemTypeId, Product,
    ProductId, RankingSnapshot, RankingStats, RecyclingEvent, RecyclingStats, RedemptionEvent,
    RedemptionFilter, Store, StoreId, StoreRankEntry, User, UserId, UserRankEntry, Verification,
};

use crate::error::{Result, StoreError};
use crate::{validate_limit, LedgerStore};

/// PostgreSQL-backed implementation of [`LedgerStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are the caller's responsibility.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn parse_status(s: &str) -> Result<EntityStatus> {
    EntityStatus::parse(s).ok_or_else(|| StoreError::Database(format!("unknown status: {s}")))
}

fn parse_event_id(s: &str) -> Result<EventId> {
    s.parse()
        .map_err(|_| StoreError::Database(format!("corrupt event id: {s}")))
}

// ============================================================================
// Row mapping
// ============================================================================

fn user_from_row(row: &PgRow) -> Result<User> {
    let status: String = row.try_get("status")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        points_balance: row.try_get("points_balance")?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn store_from_row(row: &PgRow) -> Result<Store> {
    let status: String = row.try_get("status")?;
    Ok(Store {
        id: StoreId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    let status: String = row.try_get("status")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        cost_in_points: row.try_get("cost_in_points")?,
        stock: row.try_get("stock")?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn item_type_from_row(row: &PgRow) -> Result<ItemType> {
    let status: String = row.try_get("status")?;
    Ok(ItemType {
        id: ItemTypeId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        points_per_unit: row.try_get("points_per_unit")?,
        status: parse_status(&status)?,
    })
}

fn redemption_from_row(row: &PgRow) -> Result<RedemptionEvent> {
    let id: String = row.try_get("id")?;
    Ok(RedemptionEvent {
        id: parse_event_id(&id)?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        points_spent: row.try_get("points_spent")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn recycling_from_row(row: &PgRow) -> Result<RecyclingEvent> {
    let id: String = row.try_get("id")?;
    Ok(RecyclingEvent {
        id: parse_event_id(&id)?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        item_type_id: ItemTypeId::from_uuid(row.try_get("item_type_id")?),
        weight: row.try_get("weight")?,
        points_awarded: row.try_get("points_awarded")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> Result<RankingSnapshot> {
    let id: String = row.try_get("id")?;
    Ok(RankingSnapshot {
        id: parse_event_id(&id)?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        points: row.try_get("points")?,
        rank: row.try_get("rank")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

fn user_rank_from_row(row: &PgRow) -> Result<UserRankEntry> {
    Ok(UserRankEntry {
        user_id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        points: row.try_get("points_balance")?,
        rank: row.try_get("rank")?,
    })
}

fn store_rank_from_row(row: &PgRow) -> Result<StoreRankEntry> {
    Ok(StoreRankEntry {
        store_id: StoreId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        points_redeemed: row.try_get("points_redeemed")?,
        redemption_count: row.try_get("redemption_count")?,
        rank: row.try_get("rank")?,
    })
}

const USER_COLUMNS: &str = "id, name, email, points_balance, status, created_at";
const STORE_COLUMNS: &str = "id, name, address, status, created_at";
const PRODUCT_COLUMNS: &str =
    "id, store_id, name, description, cost_in_points, stock, status, created_at";
const USER_RANK_ORDER: &str = "ORDER BY points_balance DESC, id ASC";

#[async_trait]
impl LedgerStore for PgStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn put_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, points_balance, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, \
               email = EXCLUDED.email, \
               points_balance = EXCLUDED.points_balance, \
               status = EXCLUDED.status",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.points_balance)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND status = 'active'");
        sqlx::query(&query)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn deactivate_user(&self, user_id: &UserId) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET status = 'inactive' WHERE id = $1 AND status = 'active'")
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("user", user_id));
        }
        Ok(())
    }

    // =========================================================================
    // Store / Product / Item Type Operations
    // =========================================================================

    async fn put_store(&self, store: &Store) -> Result<()> {
        sqlx::query(
            "INSERT INTO stores (id, name, address, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, \
               address = EXCLUDED.address, \
               status = EXCLUDED.status",
        )
        .bind(store.id.as_uuid())
        .bind(&store.name)
        .bind(&store.address)
        .bind(store.status.as_str())
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_store(&self, store_id: &StoreId) -> Result<Option<Store>> {
        let query =
            format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 AND status = 'active'");
        sqlx::query(&query)
            .bind(store_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| store_from_row(&row))
            .transpose()
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let query =
            format!("SELECT {STORE_COLUMNS} FROM stores WHERE status = 'active' ORDER BY name");
        sqlx::query(&query)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(store_from_row)
            .collect()
    }

    async fn put_product(&self, product: &Product) -> Result<()> {
        let store_exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM stores WHERE id = $1")
            .bind(product.store_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !store_exists {
            return Err(not_found("store", product.store_id));
        }

        sqlx::query(
            "INSERT INTO products \
               (id, store_id, name, description, cost_in_points, stock, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, \
               description = EXCLUDED.description, \
               cost_in_points = EXCLUDED.cost_in_points, \
               stock = EXCLUDED.stock, \
               status = EXCLUDED.status",
        )
        .bind(product.id.as_uuid())
        .bind(product.store_id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.cost_in_points)
        .bind(product.stock)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let query =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status = 'active'");
        sqlx::query(&query)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| product_from_row(&row))
            .transpose()
    }

    async fn list_available_products(&self, store_id: Option<&StoreId>) -> Result<Vec<Product>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.id, p.store_id, p.name, p.description, p.cost_in_points, \
                    p.stock, p.status, p.created_at \
             FROM products p \
             JOIN stores s ON s.id = p.store_id \
             WHERE p.status = 'active' AND s.status = 'active' AND p.stock > 0",
        );
        if let Some(store_id) = store_id {
            builder.push(" AND p.store_id = ");
            builder.push_bind(store_id.as_uuid());
        }
        builder.push(" ORDER BY p.name");

        builder
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(product_from_row)
            .collect()
    }

    async fn put_item_type(&self, item_type: &ItemType) -> Result<()> {
        sqlx::query(
            "INSERT INTO item_types (id, name, description, points_per_unit, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, \
               description = EXCLUDED.description, \
               points_per_unit = EXCLUDED.points_per_unit, \
               status = EXCLUDED.status",
        )
        .bind(item_type.id.as_uuid())
        .bind(&item_type.name)
        .bind(&item_type.description)
        .bind(item_type.points_per_unit)
        .bind(item_type.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_item_type(&self, item_type_id: &ItemTypeId) -> Result<Option<ItemType>> {
        sqlx::query(
            "SELECT id, name, description, points_per_unit, status \
             FROM item_types WHERE id = $1 AND status = 'active'",
        )
        .bind(item_type_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(|row| item_type_from_row(&row))
        .transpose()
    }

    async fn list_item_types(&self) -> Result<Vec<ItemType>> {
        sqlx::query(
            "SELECT id, name, description, points_per_unit, status \
             FROM item_types WHERE status = 'active' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(item_type_from_row)
        .collect()
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let pattern = format!("%{query}%");
        sqlx::query(
            "SELECT p.id, p.store_id, p.name, p.description, p.cost_in_points, \
                    p.stock, p.status, p.created_at \
             FROM products p \
             JOIN stores s ON s.id = p.store_id \
             WHERE (p.name ILIKE $1 OR p.description ILIKE $1) \
               AND p.status = 'active' AND s.status = 'active' AND p.stock > 0 \
             ORDER BY p.name",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(product_from_row)
        .collect()
    }

    // =========================================================================
    // Ledger Primitives
    // =========================================================================

    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64> {
        // Single guarded UPDATE: the check and the apply are one statement,
        // so concurrent adjustments on the same row serialize in the database.
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET points_balance = points_balance + $2 \
             WHERE id = $1 AND status = 'active' AND points_balance + $2 >= 0 \
             RETURNING points_balance",
        )
        .bind(user_id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(balance) = updated {
            return Ok(balance);
        }

        // Distinguish a missing user from an underflow.
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT points_balance FROM users WHERE id = $1 AND status = 'active'",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match balance {
            Some(balance) => Err(StoreError::InsufficientBalance {
                balance,
                required: delta.saturating_neg(),
            }),
            None => Err(not_found("user", user_id)),
        }
    }

    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> Result<i64> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE products SET stock = stock + $2 \
             WHERE id = $1 AND status = 'active' AND stock + $2 >= 0 \
             RETURNING stock",
        )
        .bind(product_id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(stock) = updated {
            return Ok(stock);
        }

        let stock = sqlx::query_scalar::<_, i64>(
            "SELECT stock FROM products WHERE id = $1 AND status = 'active'",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match stock {
            Some(stock) => Err(StoreError::InsufficientStock {
                stock,
                requested: delta.saturating_neg(),
            }),
            None => Err(not_found("product", product_id)),
        }
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
        let mut tx = self.pool.begin().await?;

        // Lock order is fixed (user, then product) so concurrent redemptions
        // cannot deadlock.
        let user_query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let user = sqlx::query(&user_query)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("user", user_id))?;

        let product_query =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let product = sqlx::query(&product_query)
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| product_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("product", product_id))?;

        let store_query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1");
        let store = sqlx::query(&store_query)
            .bind(product.store_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| store_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("store", product.store_id))?;

        let plan = redemption::check_redemption(&user, &store, &product, quantity)?;

        sqlx::query("UPDATE users SET points_balance = points_balance - $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(plan.cost)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        let event = RedemptionEvent::new(user.id, store.id, product.id, quantity, plan.cost);
        sqlx::query(
            "INSERT INTO redemption_events \
               (id, user_id, store_id, product_id, quantity, points_spent, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id.to_string())
        .bind(event.user_id.as_uuid())
        .bind(event.store_id.as_uuid())
        .bind(event.product_id.as_uuid())
        .bind(event.quantity)
        .bind(event.points_spent)
        .bind(event.occurred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %event.user_id,
            product_id = %event.product_id,
            quantity = event.quantity,
            points_spent = event.points_spent,
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
        let user_query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query(&user_query)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("user", user_id))?;

        let product_query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query(&product_query)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| product_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("product", product_id))?;

        let store_query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1");
        let store = sqlx::query(&store_query)
            .bind(product.store_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| store_from_row(&row))
            .transpose()?
            .ok_or_else(|| not_found("store", product.store_id))?;

        match redemption::check_redemption(&user, &store, &product, quantity) {
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

        let mut tx = self.pool.begin().await?;

        let user_query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let user = sqlx::query(&user_query)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()?
            .filter(|u| u.status.is_active())
            .ok_or_else(|| not_found("user", user_id))?;

        let store_active = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM stores WHERE id = $1 AND status = 'active'",
        )
        .bind(store_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
        if !store_active {
            return Err(not_found("store", store_id));
        }

        let item_type = sqlx::query(
            "SELECT id, name, description, points_per_unit, status \
             FROM item_types WHERE id = $1 AND status = 'active'",
        )
        .bind(item_type_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| item_type_from_row(&row))
        .transpose()?
        .ok_or_else(|| not_found("item type", item_type_id))?;

        let points = recycling::points_for_weight(weight, item_type.points_per_unit)?;

        sqlx::query("UPDATE users SET points_balance = points_balance + $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(points)
            .execute(&mut *tx)
            .await?;

        let event = RecyclingEvent::new(user.id, *store_id, item_type.id, weight, points);
        sqlx::query(
            "INSERT INTO recycling_events \
               (id, user_id, store_id, item_type_id, weight, points_awarded, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id.to_string())
        .bind(event.user_id.as_uuid())
        .bind(event.store_id.as_uuid())
        .bind(event.item_type_id.as_uuid())
        .bind(event.weight)
        .bind(event.points_awarded)
        .bind(event.occurred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %event.user_id,
            store_id = %event.store_id,
            weight = event.weight,
            points_awarded = event.points_awarded,
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
        // ULID ids sort lexicographically in chronological order.
        sqlx::query(
            "SELECT id, user_id, store_id, product_id, quantity, points_spent, occurred_at \
             FROM redemption_events WHERE user_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(redemption_from_row)
        .collect()
    }

    async fn list_recycling_by_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>> {
        sqlx::query(
            "SELECT id, user_id, store_id, item_type_id, weight, points_awarded, occurred_at \
             FROM recycling_events WHERE user_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(recycling_from_row)
        .collect()
    }

    async fn list_redemptions_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RedemptionEvent>> {
        sqlx::query(
            "SELECT id, user_id, store_id, product_id, quantity, points_spent, occurred_at \
             FROM redemption_events WHERE store_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(store_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(redemption_from_row)
        .collect()
    }

    async fn list_recycling_by_store(
        &self,
        store_id: &StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecyclingEvent>> {
        sqlx::query(
            "SELECT id, user_id, store_id, item_type_id, weight, points_awarded, occurred_at \
             FROM recycling_events WHERE store_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(store_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(recycling_from_row)
        .collect()
    }

    async fn recycling_stats(&self) -> Result<RecyclingStats> {
        let row = sqlx::query(
            "SELECT COUNT(*)::BIGINT AS total_deposits, \
                    COALESCE(SUM(weight), 0)::DOUBLE PRECISION AS total_weight, \
                    COALESCE(SUM(points_awarded), 0)::BIGINT AS total_points_awarded \
             FROM recycling_events",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RecyclingStats {
            total_deposits: row.try_get("total_deposits")?,
            total_weight: row.try_get("total_weight")?,
            total_points_awarded: row.try_get("total_points_awarded")?,
        })
    }

    // =========================================================================
    // Ranking Operations
    // =========================================================================

    async fn leaderboard_by_points(&self, limit: i64) -> Result<Vec<UserRankEntry>> {
        validate_limit(limit)?;

        let query = format!(
            "SELECT id, name, points_balance, \
                    ROW_NUMBER() OVER ({USER_RANK_ORDER}) AS rank \
             FROM users WHERE status = 'active' \
             {USER_RANK_ORDER} LIMIT $1"
        );
        sqlx::query(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(user_rank_from_row)
            .collect()
    }

    async fn leaderboard_by_redeemed_points(
        &self,
        limit: i64,
        filter: &RedemptionFilter,
    ) -> Result<Vec<StoreRankEntry>> {
        validate_limit(limit)?;
        filter.validate().map_err(StoreError::from)?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT s.id, s.name, \
                    COALESCE(SUM(r.points_spent), 0)::BIGINT AS points_redeemed, \
                    COUNT(r.id)::BIGINT AS redemption_count, \
                    ROW_NUMBER() OVER (ORDER BY COALESCE(SUM(r.points_spent), 0) DESC, \
                                                COUNT(r.id) DESC, s.id ASC) AS rank \
             FROM redemption_events r \
             JOIN stores s ON s.id = r.store_id \
             WHERE s.status = 'active'",
        );
        if let Some(start) = filter.start_bound() {
            builder.push(" AND r.occurred_at >= ");
            builder.push_bind(start);
        }
        if let Some(end) = filter.end_bound() {
            builder.push(" AND r.occurred_at < ");
            builder.push_bind(end);
        }
        builder.push(
            " GROUP BY s.id, s.name \
              ORDER BY points_redeemed DESC, redemption_count DESC, s.id ASC LIMIT ",
        );
        builder.push_bind(limit);

        builder
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(store_rank_from_row)
            .collect()
    }

    async fn user_rank(&self, user_id: &UserId) -> Result<UserRankEntry> {
        let query = format!(
            "WITH ranked AS ( \
               SELECT id, name, points_balance, \
                      ROW_NUMBER() OVER ({USER_RANK_ORDER}) AS rank \
               FROM users WHERE status = 'active' \
             ) \
             SELECT id, name, points_balance, rank FROM ranked WHERE id = $1"
        );
        let row = sqlx::query(&query)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("user", user_id))?;
        user_rank_from_row(&row)
    }

    async fn record_history_snapshot(&self, user_id: &UserId) -> Result<RankingSnapshot> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "WITH ranked AS ( \
               SELECT id, name, points_balance, \
                      ROW_NUMBER() OVER ({USER_RANK_ORDER}) AS rank \
               FROM users WHERE status = 'active' \
             ) \
             SELECT id, name, points_balance, rank FROM ranked WHERE id = $1"
        );
        let row = sqlx::query(&query)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found("user", user_id))?;
        let entry = user_rank_from_row(&row)?;

        let snapshot = RankingSnapshot::new(entry.user_id, entry.points, entry.rank);
        sqlx::query(
            "INSERT INTO ranking_snapshots (id, user_id, points, rank, recorded_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.user_id.as_uuid())
        .bind(snapshot.points)
        .bind(snapshot.rank)
        .bind(snapshot.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(snapshot)
    }

    async fn list_snapshots_by_user(&self, user_id: &UserId) -> Result<Vec<RankingSnapshot>> {
        sqlx::query(
            "SELECT id, user_id, points, rank, recorded_at \
             FROM ranking_snapshots WHERE user_id = $1 ORDER BY id DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(snapshot_from_row)
        .collect()
    }

    async fn ranking_stats(&self) -> Result<RankingStats> {
        // General figures cover users actually holding points.
        let row = sqlx::query(
            "SELECT COUNT(*)::BIGINT AS total_users, \
                    COALESCE(MAX(points_balance), 0)::BIGINT AS max_points, \
                    COALESCE(AVG(points_balance), 0)::DOUBLE PRECISION AS average_points, \
                    COALESCE(PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY points_balance), 0)\
                        ::DOUBLE PRECISION AS median_points \
             FROM users WHERE status = 'active' AND points_balance > 0",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_users = self.leaderboard_by_points(RankingStats::TOP_LIMIT).await?;

        Ok(RankingStats {
            total_users: row.try_get("total_users")?,
            max_points: row.try_get("max_points")?,
            average_points: row.try_get("average_points")?,
            median_points: row.try_get("median_points")?,
            top_users,
        })
    }
}
