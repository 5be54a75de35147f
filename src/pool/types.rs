//! Pool tooling types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ProxyType;

/// Errors from pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid pool entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("Pool entry {0} not found")]
    UnknownEntry(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Aggregate view of the pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub available_entries: usize,
    pub total_capacity: u64,
    pub used_slots: u64,
    /// Slots still open on active entries.
    pub free_slots: u64,
    pub by_type: BTreeMap<ProxyType, usize>,
}
