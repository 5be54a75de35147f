//! Subscription plan tiers and the limits they grant.
//!
//! # Responsibilities
//! - Map a plan tier to its data, allocation and connection limits
//! - Compute subscription expiry on registration and plan change
//!
//! Everything here is pure; callers apply the results inside a store
//! transaction.

pub mod policy;

pub use policy::{extend_expiry, plan_limits, PlanLimits, PlanTier, SUBSCRIPTION_PERIOD_DAYS};
