//! Plan-limit policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of one paid subscription period.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// Closed set of plan tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Starter,
    Professional,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Professional => "professional",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Lenient parse: anything unrecognized is treated as STARTER.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(PlanTier::Starter),
            "professional" => Ok(PlanTier::Professional),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

/// Limits granted by a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub data_limit_gb: f64,
    pub proxy_allocation_limit: u32,
    pub concurrent_connection_limit: u32,
}

/// Limits for a tier.
pub fn plan_limits(tier: PlanTier) -> PlanLimits {
    match tier {
        PlanTier::Starter => PlanLimits {
            data_limit_gb: 10.0,
            proxy_allocation_limit: 10,
            concurrent_connection_limit: 50,
        },
        PlanTier::Professional => PlanLimits {
            data_limit_gb: 50.0,
            proxy_allocation_limit: 50,
            concurrent_connection_limit: 500,
        },
        PlanTier::Enterprise => PlanLimits {
            data_limit_gb: 200.0,
            proxy_allocation_limit: 200,
            concurrent_connection_limit: 10_000,
        },
    }
}

/// New expiry after a plan purchase.
///
/// A running subscription is extended from its current expiry; a lapsed one
/// restarts from `now`.
pub fn extend_expiry(current: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let period = Duration::days(SUBSCRIPTION_PERIOD_DAYS);
    if current > now {
        current + period
    } else {
        now + period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits_table() {
        let starter = plan_limits(PlanTier::Starter);
        assert_eq!(starter.data_limit_gb, 10.0);
        assert_eq!(starter.proxy_allocation_limit, 10);
        assert_eq!(starter.concurrent_connection_limit, 50);

        let pro = plan_limits(PlanTier::Professional);
        assert_eq!(pro.data_limit_gb, 50.0);
        assert_eq!(pro.proxy_allocation_limit, 50);
        assert_eq!(pro.concurrent_connection_limit, 500);

        let ent = plan_limits(PlanTier::Enterprise);
        assert_eq!(ent.data_limit_gb, 200.0);
        assert_eq!(ent.proxy_allocation_limit, 200);
        assert_eq!(ent.concurrent_connection_limit, 10_000);
    }

    #[test]
    fn test_unknown_tier_defaults_to_starter() {
        assert_eq!(PlanTier::parse_or_default("platinum"), PlanTier::Starter);
        assert_eq!(PlanTier::parse_or_default(""), PlanTier::Starter);
        assert_eq!(PlanTier::parse_or_default("ENTERPRISE"), PlanTier::Enterprise);
        assert_eq!(
            plan_limits(PlanTier::parse_or_default("gold")),
            plan_limits(PlanTier::Starter)
        );
    }

    #[test]
    fn test_extend_running_subscription() {
        let now = Utc::now();
        let expires = now + Duration::days(5);
        assert_eq!(extend_expiry(expires, now), now + Duration::days(35));
    }

    #[test]
    fn test_reset_lapsed_subscription() {
        let now = Utc::now();
        let expired = now - Duration::days(1);
        assert_eq!(extend_expiry(expired, now), now + Duration::days(30));

        // Expiring exactly now counts as lapsed
        assert_eq!(extend_expiry(now, now), now + Duration::days(30));
    }
}
