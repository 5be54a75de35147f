//! Allocator inputs, outputs and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Allocation, ProxyPoolEntry, ProxyType, User};

/// Errors returned by the allocator.
///
/// All of them are terminal: retrying the same call cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The user has no subscription, or it has been deactivated.
    #[error("No active subscription")]
    NoSubscription,

    /// The subscription's expiry has passed.
    #[error("Subscription expired")]
    SubscriptionExpired,

    /// The user already received their allocation batch.
    #[error("Proxies already allocated for this subscription")]
    AlreadyAllocated,

    /// Not enough free pool entries to satisfy the whole request.
    #[error("Insufficient proxy capacity: requested {requested}, available {available}")]
    InsufficientCapacity { requested: u32, available: u32 },

    /// The gateway port range cannot fit the request.
    #[error("Gateway port range exhausted while reserving {requested} ports")]
    PortsExhausted { requested: u32 },

    /// Operation exists in the API but has no implementation yet.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl AllocationError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AllocationError::NoSubscription => "no_subscription",
            AllocationError::SubscriptionExpired => "subscription_expired",
            AllocationError::AlreadyAllocated => "already_allocated",
            AllocationError::InsufficientCapacity { .. } => "insufficient_capacity",
            AllocationError::PortsExhausted { .. } => "ports_exhausted",
            AllocationError::NotImplemented(_) => "not_implemented",
        }
    }
}

/// Where clients connect: the gateway's public address and listening port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEndpoint {
    pub address: String,
    pub listen_port: u16,
}

/// Credentials a user presents to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// One allocated proxy as handed back to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub pool_entry_id: u64,
    pub gateway_address: String,
    pub gateway_virtual_port: u16,
    pub gateway_listen_port: u16,
    pub credential: Credential,
    pub allocated_at: DateTime<Utc>,
    pub original_proxy_type: ProxyType,
    pub original_proxy_country: Option<String>,
}

/// Listing rows have the same shape as freshly allocated ones.
pub type AllocationView = AllocationResult;

impl AllocationResult {
    pub fn new(allocation: &Allocation, entry: &ProxyPoolEntry, user: &User, gateway: &GatewayEndpoint) -> Self {
        Self {
            pool_entry_id: entry.id,
            gateway_address: gateway.address.clone(),
            gateway_virtual_port: allocation.gateway_port,
            gateway_listen_port: gateway.listen_port,
            credential: Credential {
                username: user.username.clone(),
                password: user.api_key.clone(),
            },
            allocated_at: allocation.allocated_at,
            original_proxy_type: entry.proxy_type,
            original_proxy_country: entry.country.clone(),
        }
    }

    /// `username_vport:password@address:listen_port`, the line users paste
    /// into their proxy client.
    pub fn connection_string(&self) -> String {
        format!(
            "{}_{}:{}@{}:{}",
            self.credential.username,
            self.gateway_virtual_port,
            self.credential.password,
            self.gateway_address,
            self.gateway_listen_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AllocationError::InsufficientCapacity { requested: 5, available: 3 };
        assert_eq!(err.to_string(), "Insufficient proxy capacity: requested 5, available 3");
        assert_eq!(err.reason(), "insufficient_capacity");

        let err = AllocationError::NotImplemented("Proxy release");
        assert_eq!(err.to_string(), "Proxy release is not implemented");
    }

    #[test]
    fn test_connection_string() {
        let result = AllocationResult {
            pool_entry_id: 1,
            gateway_address: "gw.example.net".into(),
            gateway_virtual_port: 10001,
            gateway_listen_port: 8080,
            credential: Credential {
                username: "alice".into(),
                password: "pk_abc123".into(),
            },
            allocated_at: Utc::now(),
            original_proxy_type: ProxyType::Residential,
            original_proxy_country: Some("US".into()),
        };
        assert_eq!(result.connection_string(), "alice_10001:pk_abc123@gw.example.net:8080");
    }
}
