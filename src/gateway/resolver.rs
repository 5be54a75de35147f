//! Credential → upstream lookup for the forwarding layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::gateway::credentials::GatewayCredentials;
use crate::model::ProxyType;
use crate::store::Store;

/// Where the gateway should send a user's traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub user_id: u64,
    pub username: String,
    pub gateway_port: u16,
    pub upstream_ip: String,
    pub upstream_port: u16,
    pub upstream_username: Option<String>,
    pub upstream_password: Option<String>,
    pub proxy_type: ProxyType,
    pub country: Option<String>,
    pub allocated_at: DateTime<Utc>,
}

/// Resolves gateway credentials against committed allocations.
pub struct GatewayResolver {
    store: Arc<Store>,
}

impl GatewayResolver {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// `None` unless an active user with this username and API key owns an
    /// allocation on `creds.vport`.
    pub fn resolve(&self, creds: &GatewayCredentials) -> Option<GatewayRoute> {
        let state = self.store.snapshot();
        let user = state
            .user_by_username(&creds.username)
            .filter(|u| u.is_active && u.api_key == creds.api_key)?;
        let allocation = state
            .allocations
            .iter()
            .find(|a| a.user_id == user.id && a.gateway_port == creds.vport)?;
        let entry = state.pool.get(&allocation.proxy_pool_id)?;

        tracing::debug!(user_id = user.id, vport = creds.vport, upstream = %entry.upstream_addr(), "Gateway credentials resolved");
        Some(GatewayRoute {
            user_id: user.id,
            username: user.username.clone(),
            gateway_port: allocation.gateway_port,
            upstream_ip: entry.ip_address.clone(),
            upstream_port: entry.port,
            upstream_username: entry.proxy_username.clone(),
            upstream_password: entry.proxy_password.clone(),
            proxy_type: entry.proxy_type,
            country: entry.country.clone(),
            allocated_at: allocation.allocated_at,
        })
    }
}
