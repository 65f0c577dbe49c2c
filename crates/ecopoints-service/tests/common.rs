//! Shared test harness for integration tests.

#![allow(dead_code)] // each integration test binary uses a subset of helpers

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use ecopoints_core::{
    ItemType, ItemTypeId, Product, ProductId, Store, StoreId, User, UserId,
};
use ecopoints_service::{create_router, AppState, ServiceConfig};
use ecopoints_store::{LedgerStore, MemStore};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the backing store, for seeding fixtures.
    pub store: Arc<MemStore>,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemStore::new());

        let state = AppState::new(store.clone(), ServiceConfig::default());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Seed an active user with the given points balance.
    pub async fn seed_user(&self, name: &str, balance: i64) -> UserId {
        let mut user = User::new(UserId::generate(), name, format!("{name}@example.com"));
        user.points_balance = balance;
        self.store.put_user(&user).await.expect("Failed to seed user");
        user.id
    }

    /// Seed an active store.
    pub async fn seed_store(&self, name: &str) -> StoreId {
        let store = Store::new(StoreId::generate(), name, "1 Green St");
        self.store
            .put_store(&store)
            .await
            .expect("Failed to seed store");
        store.id
    }

    /// Seed an active product in the given store.
    pub async fn seed_product(
        &self,
        store_id: StoreId,
        name: &str,
        cost_in_points: i64,
        stock: i64,
    ) -> ProductId {
        let product = Product::new(ProductId::generate(), store_id, name, cost_in_points, stock);
        self.store
            .put_product(&product)
            .await
            .expect("Failed to seed product");
        product.id
    }

    /// Seed an active item type with the given points-per-kilogram rate.
    pub async fn seed_item_type(&self, name: &str, points_per_unit: f64) -> ItemTypeId {
        let item_type = ItemType::new(ItemTypeId::generate(), name, points_per_unit);
        self.store
            .put_item_type(&item_type)
            .await
            .expect("Failed to seed item type");
        item_type.id
    }

    /// Fetch a user's current points balance straight from the store.
    pub async fn balance_of(&self, user_id: &UserId) -> i64 {
        self.store
            .get_user(user_id)
            .await
            .expect("Failed to fetch user")
            .expect("User not found")
            .points_balance
    }

    /// Fetch a product's current stock straight from the store.
    pub async fn stock_of(&self, product_id: &ProductId) -> i64 {
        self.store
            .get_product(product_id)
            .await
            .expect("Failed to fetch product")
            .expect("Product not found")
            .stock
    }
}
