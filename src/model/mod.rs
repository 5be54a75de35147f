//! Persistent record types.
//!
//! # Data Flow
//! ```text
//! operator tooling ──▶ ProxyPoolEntry ◀── allocator (current_users, last_used)
//! registration     ──▶ User + Subscription ◀── plan change / usage
//! allocator        ──▶ Allocation (user ⇄ entry ⇄ gateway port)
//! ```
//!
//! Records are plain data. All mutation goes through a `Store` transaction.

pub mod allocation;
pub mod pool;
pub mod subscription;
pub mod user;

pub use allocation::Allocation;
pub use pool::{NewPoolEntry, ProxyPoolEntry, ProxyType};
pub use subscription::Subscription;
pub use user::User;
