use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binding of one user to one pool entry through a gateway port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub id: u64,
    pub user_id: u64,
    pub proxy_pool_id: u64,
    /// Globally unique virtual port on the gateway.
    pub gateway_port: u16,
    pub allocated_at: DateTime<Utc>,
}
