//! User registration and subscription management.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::accounts::types::{AccountError, NewUser, UserStats};
use crate::model::user::generate_api_key;
use crate::model::{Subscription, User};
use crate::observability::metrics;
use crate::plans::PlanTier;
use crate::store::Store;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Account operations over the shared store.
pub struct Accounts {
    store: Arc<Store>,
}

impl Accounts {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Create a user with a STARTER subscription.
    pub async fn register(&self, new: NewUser) -> Result<User, AccountError> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        if username.is_empty() || username.contains(':') {
            return Err(AccountError::InvalidInput("username must be non-empty and must not contain ':'".into()));
        }
        if !email.contains('@') {
            return Err(AccountError::InvalidInput("email address is malformed".into()));
        }

        let now = Utc::now();
        let user = self
            .store
            .transact(|state| {
                if state.user_by_email(&email).is_some() {
                    return Err(AccountError::EmailTaken);
                }
                if state.user_by_username(&username).is_some() {
                    return Err(AccountError::UsernameTaken);
                }

                let id = state.allocate_user_id();
                let user = User {
                    id,
                    username,
                    email,
                    api_key: generate_api_key(),
                    is_active: true,
                    created_at: now,
                };
                state.users.insert(id, user.clone());
                state
                    .subscriptions
                    .insert(id, Subscription::for_plan(id, PlanTier::Starter, now));
                Ok(user)
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        metrics::record_registration();
        Ok(user)
    }

    /// Resolve an API key to an active user.
    pub fn authenticate(&self, api_key: &str) -> Result<User, AccountError> {
        let state = self.store.snapshot();
        let user = state
            .user_by_api_key(api_key)
            .ok_or(AccountError::InvalidApiKey)?;
        if !user.is_active {
            return Err(AccountError::UserInactive);
        }
        Ok(user.clone())
    }

    pub fn user(&self, user_id: u64) -> Result<User, AccountError> {
        self.store
            .snapshot()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(AccountError::UnknownUser(user_id))
    }

    pub fn subscription(&self, user_id: u64) -> Result<Subscription, AccountError> {
        self.store
            .snapshot()
            .subscriptions
            .get(&user_id)
            .cloned()
            .ok_or(AccountError::UnknownUser(user_id))
    }

    /// Switch plans: new limits, extended expiry.
    pub async fn change_plan(&self, user_id: u64, tier: PlanTier) -> Result<Subscription, AccountError> {
        self.change_plan_at(user_id, tier, Utc::now()).await
    }

    pub async fn change_plan_at(
        &self,
        user_id: u64,
        tier: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AccountError> {
        let sub = self
            .store
            .transact(|state| {
                let sub = state
                    .subscriptions
                    .get_mut(&user_id)
                    .ok_or(AccountError::UnknownUser(user_id))?;
                sub.change_plan(tier, now);
                Ok::<_, AccountError>(sub.clone())
            })
            .await?;

        tracing::info!(user_id, plan = %tier, expires_at = %sub.expires_at, "Plan changed");
        Ok(sub)
    }

    /// Add gateway traffic to the user's data usage.
    pub async fn record_data_usage(&self, user_id: u64, bytes: u64) -> Result<f64, AccountError> {
        let used = self
            .store
            .transact(|state| {
                let sub = state
                    .subscriptions
                    .get_mut(&user_id)
                    .ok_or(AccountError::UnknownUser(user_id))?;
                sub.data_used_gb += bytes as f64 / BYTES_PER_GB;
                Ok::<_, AccountError>(sub.data_used_gb)
            })
            .await?;

        tracing::debug!(user_id, bytes, data_used_gb = used, "Data usage recorded");
        Ok(used)
    }

    pub fn stats(&self, user_id: u64) -> Result<UserStats, AccountError> {
        let sub = self.subscription(user_id)?;
        Ok(UserStats::from_subscription(&sub, Utc::now()))
    }
}
