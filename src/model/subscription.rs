//! Per-user subscription.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::plans::{extend_expiry, plan_limits, PlanTier, SUBSCRIPTION_PERIOD_DAYS};

/// A user's subscription. Exactly one per user.
///
/// Invariant: `allocated_proxies_count <= allocated_proxies_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: u64,
    pub plan: PlanTier,
    pub data_limit_gb: f64,
    pub data_used_gb: f64,
    pub concurrent_connections: u32,
    pub allocated_proxies_limit: u32,
    pub allocated_proxies_count: u32,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Fresh subscription on `tier`, running one period from `now`.
    pub fn for_plan(user_id: u64, tier: PlanTier, now: DateTime<Utc>) -> Self {
        let limits = plan_limits(tier);
        Self {
            user_id,
            plan: tier,
            data_limit_gb: limits.data_limit_gb,
            data_used_gb: 0.0,
            concurrent_connections: limits.concurrent_connection_limit,
            allocated_proxies_limit: limits.proxy_allocation_limit,
            allocated_proxies_count: 0,
            is_active: true,
            expires_at: now + Duration::days(SUBSCRIPTION_PERIOD_DAYS),
            created_at: now,
        }
    }

    /// Move to `tier`: recompute every limit and extend expiry.
    ///
    /// Existing allocations are kept.
    pub fn change_plan(&mut self, tier: PlanTier, now: DateTime<Utc>) {
        let limits = plan_limits(tier);
        self.plan = tier;
        self.data_limit_gb = limits.data_limit_gb;
        self.concurrent_connections = limits.concurrent_connection_limit;
        self.allocated_proxies_limit = limits.proxy_allocation_limit.max(self.allocated_proxies_count);
        self.expires_at = extend_expiry(self.expires_at, now);
        self.is_active = true;
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_proxies(&self) -> u32 {
        self.allocated_proxies_limit
            .saturating_sub(self.allocated_proxies_count)
    }

    pub fn proxy_usage_percent(&self) -> f64 {
        if self.allocated_proxies_limit == 0 {
            return 0.0;
        }
        f64::from(self.allocated_proxies_count) / f64::from(self.allocated_proxies_limit) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_defaults() {
        let now = Utc::now();
        let sub = Subscription::for_plan(7, PlanTier::Starter, now);
        assert_eq!(sub.allocated_proxies_limit, 10);
        assert_eq!(sub.allocated_proxies_count, 0);
        assert_eq!(sub.concurrent_connections, 50);
        assert_eq!(sub.expires_at, now + Duration::days(30));
        assert!(!sub.is_expired_at(now));
    }

    #[test]
    fn test_change_plan_extends_running_subscription() {
        let now = Utc::now();
        let mut sub = Subscription::for_plan(1, PlanTier::Starter, now);
        sub.expires_at = now + Duration::days(5);

        sub.change_plan(PlanTier::Professional, now);
        assert_eq!(sub.plan, PlanTier::Professional);
        assert_eq!(sub.allocated_proxies_limit, 50);
        assert_eq!(sub.data_limit_gb, 50.0);
        assert_eq!(sub.concurrent_connections, 500);
        assert_eq!(sub.expires_at, now + Duration::days(35));
    }

    #[test]
    fn test_change_plan_resets_lapsed_subscription() {
        let now = Utc::now();
        let mut sub = Subscription::for_plan(1, PlanTier::Starter, now - Duration::days(40));
        sub.is_active = false;
        assert!(sub.is_expired_at(now));

        sub.change_plan(PlanTier::Enterprise, now);
        assert_eq!(sub.expires_at, now + Duration::days(30));
        assert!(sub.is_active);
    }

    #[test]
    fn test_downgrade_keeps_count_within_limit() {
        let now = Utc::now();
        let mut sub = Subscription::for_plan(1, PlanTier::Professional, now);
        sub.allocated_proxies_count = 50;

        sub.change_plan(PlanTier::Starter, now);
        assert_eq!(sub.allocated_proxies_count, 50);
        assert!(sub.allocated_proxies_count <= sub.allocated_proxies_limit);
        assert_eq!(sub.remaining_proxies(), 0);
    }

    #[test]
    fn test_usage_percent() {
        let mut sub = Subscription::for_plan(1, PlanTier::Starter, Utc::now());
        assert_eq!(sub.proxy_usage_percent(), 0.0);
        sub.allocated_proxies_count = 5;
        assert_eq!(sub.proxy_usage_percent(), 50.0);
        assert_eq!(sub.remaining_proxies(), 5);
    }
}
