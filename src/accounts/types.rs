//! Account types and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Subscription, User};
use crate::plans::PlanTier;

/// Errors from account operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User {0} not found")]
    UnknownUser(u64),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("User account is disabled")]
    UserInactive,
}

/// Registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

/// Public view of a user. Includes the API key, so only ever returned to
/// the user themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            api_key: user.api_key.clone(),
            created_at: user.created_at,
        }
    }
}

/// Dashboard numbers for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub plan: PlanTier,
    pub allocated_proxies_limit: u32,
    pub allocated_proxies_count: u32,
    pub remaining_proxies: u32,
    pub proxy_usage_percent: f64,
    pub data_limit_gb: f64,
    pub data_used_gb: f64,
    pub concurrent_connections: u32,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

impl UserStats {
    pub fn from_subscription(sub: &Subscription, now: DateTime<Utc>) -> Self {
        Self {
            plan: sub.plan,
            allocated_proxies_limit: sub.allocated_proxies_limit,
            allocated_proxies_count: sub.allocated_proxies_count,
            remaining_proxies: sub.remaining_proxies(),
            proxy_usage_percent: sub.proxy_usage_percent(),
            data_limit_gb: sub.data_limit_gb,
            data_used_gb: sub.data_used_gb,
            concurrent_connections: sub.concurrent_connections,
            expires_at: sub.expires_at,
            is_expired: sub.is_expired_at(now),
        }
    }
}
