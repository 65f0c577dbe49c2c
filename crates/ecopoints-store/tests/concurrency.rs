//! Concurrency tests for the ledger invariants.
//!
//! Balances and stock are the only shared mutable state in the system; these
//! tests drive racing operations through `Arc<dyn LedgerStore>` the same way
//! concurrent HTTP handlers would.

use std::sync::Arc;

use futures::future::join_all;

use ecopoints_core::{ItemType, ItemTypeId, Product, ProductId, Store, StoreId, User, UserId};
use ecopoints_store::{LedgerStore, MemStore, StoreError};

async fn seed(balance: i64, stock: i64, cost: i64) -> (Arc<dyn LedgerStore>, UserId, ProductId) {
    let mem: Arc<dyn LedgerStore> = Arc::new(MemStore::new());

    let mut user = User::new(UserId::generate(), "Ada", "ada@example.com");
    user.points_balance = balance;
    mem.put_user(&user).await.unwrap();

    let shop = Store::new(StoreId::generate(), "EcoMarket", "1 Green St");
    mem.put_store(&shop).await.unwrap();
    let product = Product::new(ProductId::generate(), shop.id, "Tote bag", cost, stock);
    mem.put_product(&product).await.unwrap();

    (mem, user.id, product.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redeems_on_last_unit_admit_exactly_one() {
    // stock = 1, two buyers with ample balance: one succeeds, one fails.
    let (store, user_id, product_id) = seed(1000, 1, 10).await;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.redeem(&user_id, &product_id, 1).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(StoreError::InsufficientStock { .. }))));

    let product = store.get_product(&product_id).await.unwrap();
    // Stock hit zero, so the product no longer lists as available but the
    // row still exists; a direct adjustment confirms the value.
    assert!(product.unwrap().stock == 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redeems_never_overdraw_balance() {
    // Balance covers exactly 3 of the 10 attempted redemptions.
    let (store, user_id, product_id) = seed(30, 100, 10).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.redeem(&user_id, &product_id, 1).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 3);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(StoreError::InsufficientBalance { .. })))
            .count(),
        7
    );

    let user = store.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.points_balance, 0);
    let product = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(product.stock, 97);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_credits_and_debits_stay_consistent() {
    let (store, user_id, _) = seed(0, 0, 1).await;

    let shop = Store::new(StoreId::generate(), "DropOff", "3 Bin Rd");
    store.put_store(&shop).await.unwrap();
    let item = ItemType::new(ItemTypeId::generate(), "aluminum", 10.0);
    store.put_item_type(&item).await.unwrap();

    // 20 deposits of 1kg at 10 points each, racing with 20 debits of 10.
    // Credits always land; debits fail whenever the balance is short, so the
    // final balance is a multiple of 10 within [0, 200].
    let mut tasks = Vec::new();
    for _ in 0..20 {
        let credit_store = Arc::clone(&store);
        let shop_id = shop.id;
        let item_id = item.id;
        tasks.push(tokio::spawn(async move {
            credit_store
                .register_recycling(&user_id, &shop_id, &item_id, 1.0)
                .await
                .map(|_| ())
        }));
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.adjust_balance(&user_id, -10).await.map(|_| ())
        }));
    }

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let debits_ok = outcomes
        .iter()
        .skip(1)
        .step_by(2)
        .filter(|r| r.is_ok())
        .count() as i64;

    let user = store.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.points_balance, 200 - debits_ok * 10);
    assert!(user.points_balance >= 0);
}
