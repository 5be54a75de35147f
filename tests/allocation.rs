//! Allocation under concurrency, driven straight through the library.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use proxyflow::accounts::{Accounts, NewUser};
use proxyflow::allocator::{AllocationError, Allocator, GatewayEndpoint};
use proxyflow::plans::PlanTier;
use proxyflow::pool::PoolOperator;
use proxyflow::Store;

mod common;

fn gateway() -> GatewayEndpoint {
    GatewayEndpoint {
        address: "gw.test".into(),
        listen_port: 8080,
    }
}

async fn register_users(accounts: &Accounts, count: usize) -> Vec<u64> {
    let mut ids = Vec::new();
    for i in 0..count {
        let user = accounts
            .register(NewUser {
                username: format!("user{}", i),
                email: format!("user{}@example.com", i),
            })
            .await
            .unwrap();
        ids.push(user.id);
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_allocations_never_oversubscribe() {
    let store = Arc::new(Store::new(10_000));
    PoolOperator::new(store.clone())
        .add_entries(common::pool_entries(95, 1))
        .await
        .unwrap();

    // STARTER asks for 10 each; 95 single-user slots serve exactly 9 users.
    let accounts = Accounts::new(store.clone());
    let users = register_users(&accounts, 20).await;

    let allocator = Arc::new(Allocator::new(store.clone(), gateway()));
    let handles = users.iter().map(|&id| {
        let allocator = allocator.clone();
        tokio::spawn(async move { allocator.allocate(id).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let succeeded: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(succeeded.len(), 9);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(result, AllocationError::InsufficientCapacity { requested: 10, .. }));
    }

    let ports: HashSet<u16> = succeeded
        .iter()
        .flat_map(|batch| batch.iter().map(|a| a.gateway_virtual_port))
        .collect();
    assert_eq!(ports.len(), 90);

    let state = store.snapshot();
    assert_eq!(state.allocations.len(), 90);
    assert_eq!(state.next_gateway_port, 10_090);
    for entry in state.pool.values() {
        assert!(entry.current_users <= entry.max_users);
    }
    for sub in state.subscriptions.values() {
        assert!(sub.allocated_proxies_count <= sub.allocated_proxies_limit);
        assert!(sub.allocated_proxies_count == 0 || sub.allocated_proxies_count == 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_racing_gets_one_batch() {
    let store = Arc::new(Store::new(10_000));
    PoolOperator::new(store.clone())
        .add_entries(common::pool_entries(50, 10))
        .await
        .unwrap();
    let accounts = Accounts::new(store.clone());
    let users = register_users(&accounts, 1).await;
    let allocator = Arc::new(Allocator::new(store.clone(), gateway()));

    let results: Vec<_> = join_all((0..5).map(|_| {
        let allocator = allocator.clone();
        let id = users[0];
        tokio::spawn(async move { allocator.allocate(id).await })
    }))
    .await
    .into_iter()
    .map(|joined| joined.unwrap())
    .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == AllocationError::AlreadyAllocated));
    assert_eq!(allocator.list_allocations(users[0]).len(), 10);
}

#[tokio::test]
async fn test_upgrade_then_allocate_uses_new_limit() {
    let store = Arc::new(Store::new(10_000));
    PoolOperator::new(store.clone())
        .add_entries(common::pool_entries(60, 1))
        .await
        .unwrap();
    let accounts = Accounts::new(store.clone());
    let users = register_users(&accounts, 1).await;
    accounts.change_plan(users[0], PlanTier::Professional).await.unwrap();

    let allocator = Allocator::new(store.clone(), gateway());
    let batch = allocator.allocate(users[0]).await.unwrap();
    assert_eq!(batch.len(), 50);
    let ports: Vec<u16> = batch.iter().map(|a| a.gateway_virtual_port).collect();
    assert_eq!(ports, (10_000..10_050).collect::<Vec<u16>>());

    let sub = accounts.subscription(users[0]).unwrap();
    assert_eq!(sub.allocated_proxies_count, 50);
    assert_eq!(sub.remaining_proxies(), 0);
}
