//! Proxy pool allocation.
//!
//! # Data Flow
//! ```text
//! allocate(user)
//!     → subscription active? not expired? nothing allocated yet?
//!     → pick available pool entries (ascending id), need allocated_proxies_limit
//!     → too few → InsufficientCapacity, nothing written
//!     → reserve consecutive gateway ports from the store sequence
//!     → occupy entries, write allocation rows, bump subscription count
//!     → commit (all or nothing)
//! ```
//!
//! # Design Decisions
//! - Exactly one allocation batch per user; no partial batches
//! - Ports come from a monotonic sequence inside the transaction, never from
//!   "max existing port + 1"
//! - Release is part of the surface but reports `NotImplemented`

pub mod engine;
pub mod types;

pub use engine::Allocator;
pub use types::{AllocationError, AllocationResult, AllocationView, Credential, GatewayEndpoint};
