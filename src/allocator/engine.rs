//! Proxy allocation engine.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::allocator::types::{AllocationError, AllocationResult, AllocationView, GatewayEndpoint};
use crate::model::{Allocation, ProxyPoolEntry};
use crate::observability::metrics;
use crate::store::{Store, StoreState};

/// Binds users to shared pool entries and hands out gateway ports.
pub struct Allocator {
    store: Arc<Store>,
    gateway: ArcSwap<GatewayEndpoint>,
}

impl Allocator {
    pub fn new(store: Arc<Store>, gateway: GatewayEndpoint) -> Self {
        Self {
            store,
            gateway: ArcSwap::from_pointee(gateway),
        }
    }

    /// Swap the advertised gateway endpoint (config reload).
    pub fn update_gateway(&self, gateway: GatewayEndpoint) {
        tracing::info!(address = %gateway.address, listen_port = gateway.listen_port, "Gateway endpoint updated");
        self.gateway.store(Arc::new(gateway));
    }

    pub fn gateway(&self) -> Arc<GatewayEndpoint> {
        self.gateway.load_full()
    }

    /// Allocate the user's full batch of proxies.
    pub async fn allocate(&self, user_id: u64) -> Result<Vec<AllocationResult>, AllocationError> {
        self.allocate_at(user_id, Utc::now()).await
    }

    /// [`Allocator::allocate`] with an explicit clock.
    pub async fn allocate_at(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<AllocationResult>, AllocationError> {
        let gateway = self.gateway.load_full();
        let outcome = self
            .store
            .transact(|state| allocate_in(state, user_id, now, &gateway))
            .await;

        match &outcome {
            Ok(results) => {
                tracing::info!(
                    user_id,
                    count = results.len(),
                    first_port = results.first().map(|r| r.gateway_virtual_port),
                    "Proxies allocated"
                );
                metrics::record_allocation(results.len());
                let (used, capacity) = pool_usage(&self.store.snapshot());
                metrics::record_pool_usage(used, capacity);
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Allocation rejected");
                metrics::record_allocation_failure(e.reason());
            }
        }
        outcome
    }

    /// The user's allocations joined with their pool entries, by port.
    ///
    /// Empty when the user has none (or does not exist).
    pub fn list_allocations(&self, user_id: u64) -> Vec<AllocationView> {
        let state = self.store.snapshot();
        let gateway = self.gateway.load();
        let Some(user) = state.users.get(&user_id) else {
            return Vec::new();
        };

        state
            .allocations_for(user_id)
            .into_iter()
            .filter_map(|a| {
                state
                    .pool
                    .get(&a.proxy_pool_id)
                    .map(|entry| AllocationResult::new(a, entry, user, &gateway))
            })
            .collect()
    }

    /// Returning proxies to the pool is not supported yet.
    pub async fn release(&self, user_id: u64) -> Result<(), AllocationError> {
        tracing::warn!(user_id, "Release requested but not implemented");
        metrics::record_allocation_failure("not_implemented");
        Err(AllocationError::NotImplemented("Proxy release"))
    }
}

/// The allocation transaction body. Any `Err` discards every change.
fn allocate_in(
    state: &mut StoreState,
    user_id: u64,
    now: DateTime<Utc>,
    gateway: &GatewayEndpoint,
) -> Result<Vec<AllocationResult>, AllocationError> {
    let user = state
        .users
        .get(&user_id)
        .filter(|u| u.is_active)
        .cloned()
        .ok_or(AllocationError::NoSubscription)?;

    let subscription = state
        .subscriptions
        .get(&user_id)
        .filter(|s| s.is_active)
        .ok_or(AllocationError::NoSubscription)?;
    if subscription.is_expired_at(now) {
        return Err(AllocationError::SubscriptionExpired);
    }
    if subscription.allocated_proxies_count > 0 {
        return Err(AllocationError::AlreadyAllocated);
    }
    let quantity = subscription.allocated_proxies_limit;

    let available = state
        .pool
        .values()
        .filter(|e| e.is_available())
        .take(quantity as usize)
        .count() as u32;
    if available < quantity {
        return Err(AllocationError::InsufficientCapacity {
            requested: quantity,
            available,
        });
    }
    if quantity == 0 {
        return Ok(Vec::new());
    }

    let first_port = state
        .reserve_ports(quantity)
        .map_err(|e| AllocationError::PortsExhausted { requested: e.requested })?;

    let mut bound: Vec<ProxyPoolEntry> = Vec::with_capacity(quantity as usize);
    for entry in state
        .pool
        .values_mut()
        .filter(|e| e.is_available())
        .take(quantity as usize)
    {
        let occupied = entry.occupy(now);
        debug_assert!(occupied, "candidate entry {} was not available", entry.id);
        bound.push(entry.clone());
    }

    let mut results = Vec::with_capacity(bound.len());
    // reserve_ports guarantees first_port + quantity - 1 fits in u16
    for (port, entry) in (first_port..=u16::MAX).zip(bound.iter()) {
        let allocation = Allocation {
            id: state.allocate_allocation_id(),
            user_id,
            proxy_pool_id: entry.id,
            gateway_port: port,
            allocated_at: now,
        };
        results.push(AllocationResult::new(&allocation, entry, &user, gateway));
        state.allocations.push(allocation);
    }

    if let Some(subscription) = state.subscriptions.get_mut(&user_id) {
        subscription.allocated_proxies_count = quantity;
    }
    Ok(results)
}

/// (used slots, total capacity) over active entries.
pub fn pool_usage(state: &StoreState) -> (u64, u64) {
    state
        .pool
        .values()
        .filter(|e| e.is_active)
        .fold((0, 0), |(used, cap), e| {
            (used + u64::from(e.current_users), cap + u64::from(e.max_users))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewPoolEntry, ProxyType, Subscription, User};
    use crate::plans::PlanTier;
    use chrono::Duration;

    fn gateway() -> GatewayEndpoint {
        GatewayEndpoint {
            address: "localhost".into(),
            listen_port: 8080,
        }
    }

    /// Store with `entries` single-user pool entries and one user per limit.
    async fn setup(entries: usize, limits: &[u32]) -> Arc<Store> {
        let store = Arc::new(Store::new(10000));
        let limits = limits.to_vec();
        store
            .transact(move |state| {
                for i in 0..entries {
                    let id = state.allocate_pool_id();
                    let new = NewPoolEntry::new(ProxyType::Residential, format!("10.0.0.{}", i + 1), 3128)
                        .with_max_users(1);
                    state.pool.insert(id, ProxyPoolEntry::from_new(id, new));
                }
                for limit in limits {
                    let id = state.allocate_user_id();
                    let now = Utc::now();
                    state.users.insert(id, User {
                        id,
                        username: format!("user{}", id),
                        email: format!("user{}@example.com", id),
                        api_key: format!("pk_test{}", id),
                        is_active: true,
                        created_at: now,
                    });
                    let mut sub = Subscription::for_plan(id, PlanTier::Starter, now);
                    sub.allocated_proxies_limit = limit;
                    state.subscriptions.insert(id, sub);
                }
                Ok::<_, ()>(())
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_allocate_assigns_consecutive_ports() {
        let store = setup(5, &[3]).await;
        let allocator = Allocator::new(store.clone(), gateway());

        let results = allocator.allocate(1).await.unwrap();
        let ports: Vec<u16> = results.iter().map(|r| r.gateway_virtual_port).collect();
        assert_eq!(ports, vec![10000, 10001, 10002]);
        assert_eq!(results[0].pool_entry_id, 1);
        assert_eq!(results[0].credential.username, "user1");
        assert_eq!(results[0].credential.password, "pk_test1");
        assert_eq!(results[0].gateway_listen_port, 8080);

        let snap = store.snapshot();
        assert_eq!(snap.subscriptions[&1].allocated_proxies_count, 3);
        assert_eq!(snap.pool[&1].current_users, 1);
        assert!(snap.pool[&1].last_used.is_some());
        assert_eq!(snap.pool[&4].current_users, 0);
    }

    #[tokio::test]
    async fn test_second_allocate_is_rejected() {
        let store = setup(5, &[2]).await;
        let allocator = Allocator::new(store.clone(), gateway());

        allocator.allocate(1).await.unwrap();
        let err = allocator.allocate(1).await.unwrap_err();
        assert_eq!(err, AllocationError::AlreadyAllocated);
        assert_eq!(store.snapshot().allocations.len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_capacity_is_atomic() {
        let store = setup(3, &[5]).await;
        let allocator = Allocator::new(store.clone(), gateway());

        let err = allocator.allocate(1).await.unwrap_err();
        assert_eq!(err, AllocationError::InsufficientCapacity { requested: 5, available: 3 });

        let snap = store.snapshot();
        assert!(snap.allocations.is_empty());
        assert_eq!(snap.subscriptions[&1].allocated_proxies_count, 0);
        assert!(snap.pool.values().all(|e| e.current_users == 0));
        assert_eq!(snap.next_gateway_port, 10000);
    }

    #[tokio::test]
    async fn test_subscription_checks() {
        let store = setup(5, &[1, 1]).await;
        let allocator = Allocator::new(store.clone(), gateway());

        // Unknown user
        assert_eq!(allocator.allocate(99).await.unwrap_err(), AllocationError::NoSubscription);

        store
            .transact(|state| {
                state.subscriptions.get_mut(&1).unwrap().is_active = false;
                state.subscriptions.get_mut(&2).unwrap().expires_at = Utc::now() - Duration::days(1);
                Ok::<_, ()>(())
            })
            .await
            .unwrap();

        assert_eq!(allocator.allocate(1).await.unwrap_err(), AllocationError::NoSubscription);
        assert_eq!(allocator.allocate(2).await.unwrap_err(), AllocationError::SubscriptionExpired);
    }

    #[tokio::test]
    async fn test_shared_entries_and_inactive_entries() {
        let store = setup(0, &[2, 2]).await;
        store
            .transact(|state| {
                for (ip, active) in [("10.1.0.1", false), ("10.1.0.2", true), ("10.1.0.3", true)] {
                    let id = state.allocate_pool_id();
                    let mut entry = ProxyPoolEntry::from_new(id, NewPoolEntry::new(ProxyType::Datacenter, ip, 80).with_max_users(2));
                    entry.is_active = active;
                    state.pool.insert(id, entry);
                }
                Ok::<_, ()>(())
            })
            .await
            .unwrap();
        let allocator = Allocator::new(store.clone(), gateway());

        let first = allocator.allocate(1).await.unwrap();
        let second = allocator.allocate(2).await.unwrap();
        assert_eq!(first.iter().map(|r| r.pool_entry_id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(second.iter().map(|r| r.pool_entry_id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(second[0].gateway_virtual_port, 10002);

        let snap = store.snapshot();
        assert_eq!(snap.pool[&1].current_users, 0);
        assert!(snap.pool.values().all(|e| e.current_users <= e.max_users));
        assert_eq!(pool_usage(&snap), (4, 4));
    }

    #[tokio::test]
    async fn test_list_allocations() {
        let store = setup(4, &[2, 2]).await;
        let allocator = Allocator::new(store, gateway());

        assert!(allocator.list_allocations(1).is_empty());
        assert!(allocator.list_allocations(42).is_empty());

        allocator.allocate(1).await.unwrap();
        let listed = allocator.list_allocations(1);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].original_proxy_type, ProxyType::Residential);
        assert_eq!(listed[0].original_proxy_country.as_deref(), Some("US"));
        assert!(allocator.list_allocations(2).is_empty());

        allocator.update_gateway(GatewayEndpoint {
            address: "gw.example.net".into(),
            listen_port: 9000,
        });
        let listed = allocator.list_allocations(1);
        assert_eq!(listed[1].connection_string(), "user1_10001:pk_test1@gw.example.net:9000");
    }

    #[tokio::test]
    async fn test_release_is_not_implemented() {
        let store = setup(2, &[1]).await;
        let allocator = Allocator::new(store.clone(), gateway());
        allocator.allocate(1).await.unwrap();

        let err = allocator.release(1).await.unwrap_err();
        assert!(matches!(err, AllocationError::NotImplemented(_)));
        assert_eq!(store.snapshot().pool[&1].current_users, 1);
    }

    #[tokio::test]
    async fn test_port_exhaustion_aborts() {
        let seeded = setup(3, &[2]).await;
        let mut state = StoreState::clone(&seeded.snapshot());
        state.next_gateway_port = 65535;
        let store = Arc::new(Store::from_state(state));
        let allocator = Allocator::new(store.clone(), gateway());

        let err = allocator.allocate(1).await.unwrap_err();
        assert_eq!(err, AllocationError::PortsExhausted { requested: 2 });
        assert!(store.snapshot().allocations.is_empty());
    }
}
