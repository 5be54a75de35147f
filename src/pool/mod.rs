//! Operator tooling for the shared proxy pool.
//!
//! # Responsibilities
//! - Add single entries and bulk-import pool files (TOML or JSON)
//! - Enable/disable entries
//! - Report capacity and load
//!
//! Operators never touch `current_users`; only the allocator does.

pub mod import;
pub mod operator;
pub mod types;

pub use operator::PoolOperator;
pub use types::{PoolError, PoolStats};
