//! Operator-side pool management.

use std::path::Path;
use std::sync::Arc;

use crate::allocator::engine::pool_usage;
use crate::model::{NewPoolEntry, ProxyPoolEntry};
use crate::observability::metrics;
use crate::pool::import::{load_pool_file, validate_entries};
use crate::pool::types::{PoolError, PoolStats};
use crate::store::Store;

/// Adds, lists and toggles pool entries.
pub struct PoolOperator {
    store: Arc<Store>,
}

impl PoolOperator {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn add_entry(&self, entry: NewPoolEntry) -> Result<ProxyPoolEntry, PoolError> {
        let mut added = self.add_entries(vec![entry]).await?;
        added.pop().ok_or_else(|| PoolError::InvalidEntry {
            index: 0,
            reason: "entry was not added".into(),
        })
    }

    /// Add a batch in one transaction. One invalid entry rejects the batch.
    pub async fn add_entries(&self, entries: Vec<NewPoolEntry>) -> Result<Vec<ProxyPoolEntry>, PoolError> {
        validate_entries(&entries)?;

        let added = self
            .store
            .transact(|state| {
                let mut added = Vec::with_capacity(entries.len());
                for new in entries {
                    let id = state.allocate_pool_id();
                    let entry = ProxyPoolEntry::from_new(id, new);
                    state.pool.insert(id, entry.clone());
                    added.push(entry);
                }
                Ok::<_, PoolError>(added)
            })
            .await?;

        for entry in &added {
            tracing::info!(
                id = entry.id,
                proxy_type = %entry.proxy_type,
                upstream = %entry.upstream_addr(),
                max_users = entry.max_users,
                "Pool entry added"
            );
        }
        self.publish_usage();
        Ok(added)
    }

    /// Load a TOML/JSON pool file and add its entries atomically.
    pub async fn import_file(&self, path: &Path) -> Result<Vec<ProxyPoolEntry>, PoolError> {
        let entries = load_pool_file(path)?;
        tracing::info!(path = %path.display(), count = entries.len(), "Importing pool file");
        self.add_entries(entries).await
    }

    /// Enable or disable an entry. Existing allocations are untouched.
    pub async fn set_active(&self, id: u64, active: bool) -> Result<ProxyPoolEntry, PoolError> {
        let entry = self
            .store
            .transact(|state| {
                let entry = state.pool.get_mut(&id).ok_or(PoolError::UnknownEntry(id))?;
                entry.is_active = active;
                Ok::<_, PoolError>(entry.clone())
            })
            .await?;

        tracing::info!(id, active, current_users = entry.current_users, "Pool entry toggled");
        self.publish_usage();
        Ok(entry)
    }

    pub fn entries(&self) -> Vec<ProxyPoolEntry> {
        self.store.snapshot().pool.values().cloned().collect()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.store.snapshot();
        let mut stats = PoolStats {
            total_entries: state.pool.len(),
            ..Default::default()
        };
        for entry in state.pool.values() {
            *stats.by_type.entry(entry.proxy_type).or_default() += 1;
            if entry.is_active {
                stats.active_entries += 1;
            }
            if entry.is_available() {
                stats.available_entries += 1;
            }
            stats.free_slots += u64::from(entry.free_slots());
        }
        let (used, capacity) = pool_usage(&state);
        stats.used_slots = used;
        stats.total_capacity = capacity;
        stats
    }

    fn publish_usage(&self) {
        let (used, capacity) = pool_usage(&self.store.snapshot());
        metrics::record_pool_usage(used, capacity);
    }
}
