//! The state image guarded by the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Allocation, ProxyPoolEntry, Subscription, User};

/// Everything the service persists.
///
/// Maps are ordered by id so candidate selection is stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub users: BTreeMap<u64, User>,
    /// Keyed by user id.
    pub subscriptions: BTreeMap<u64, Subscription>,
    pub pool: BTreeMap<u64, ProxyPoolEntry>,
    pub allocations: Vec<Allocation>,
    pub next_user_id: u64,
    pub next_pool_id: u64,
    pub next_allocation_id: u64,
    /// Next gateway port to hand out. Only ever moves forward.
    pub next_gateway_port: u32,
}

/// The gateway port range is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortsExhausted {
    pub requested: u32,
}

impl StoreState {
    /// Empty state whose port sequence starts at `base_port`.
    pub fn new(base_port: u16) -> Self {
        Self {
            next_user_id: 1,
            next_pool_id: 1,
            next_allocation_id: 1,
            next_gateway_port: u32::from(base_port),
            ..Default::default()
        }
    }

    /// Repair counters after loading from disk.
    ///
    /// Sequences never go backwards and never collide with stored rows.
    pub fn normalize(&mut self, base_port: u16) {
        let max_user = self.users.keys().next_back().copied().unwrap_or(0);
        self.next_user_id = self.next_user_id.max(max_user + 1);

        let max_pool = self.pool.keys().next_back().copied().unwrap_or(0);
        self.next_pool_id = self.next_pool_id.max(max_pool + 1);

        let max_alloc = self.allocations.iter().map(|a| a.id).max().unwrap_or(0);
        self.next_allocation_id = self.next_allocation_id.max(max_alloc + 1);

        let after_max_port = self
            .allocations
            .iter()
            .map(|a| u32::from(a.gateway_port) + 1)
            .max()
            .unwrap_or(0);
        self.next_gateway_port = self
            .next_gateway_port
            .max(after_max_port)
            .max(u32::from(base_port));
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn user_by_api_key(&self, api_key: &str) -> Option<&User> {
        self.users.values().find(|u| u.api_key == api_key)
    }

    /// Allocations of one user, ordered by gateway port.
    pub fn allocations_for(&self, user_id: u64) -> Vec<&Allocation> {
        let mut rows: Vec<&Allocation> = self
            .allocations
            .iter()
            .filter(|a| a.user_id == user_id)
            .collect();
        rows.sort_by_key(|a| a.gateway_port);
        rows
    }

    /// Reserve `count` consecutive gateway ports and return the first.
    pub fn reserve_ports(&mut self, count: u32) -> Result<u16, PortsExhausted> {
        let exhausted = PortsExhausted { requested: count };
        let first = u16::try_from(self.next_gateway_port).map_err(|_| exhausted)?;
        let last = self.next_gateway_port + count.saturating_sub(1);
        if last > u32::from(u16::MAX) {
            return Err(exhausted);
        }
        self.next_gateway_port += count;
        Ok(first)
    }

    pub fn allocate_user_id(&mut self) -> u64 {
        let id = self.next_user_id;
        self.next_user_id += 1;
        id
    }

    pub fn allocate_pool_id(&mut self) -> u64 {
        let id = self.next_pool_id;
        self.next_pool_id += 1;
        id
    }

    pub fn allocate_allocation_id(&mut self) -> u64 {
        let id = self.next_allocation_id;
        self.next_allocation_id += 1;
        id
    }
}
