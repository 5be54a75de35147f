//! User accounts and their subscriptions.

pub mod registry;
pub mod types;

pub use registry::Accounts;
pub use types::{AccountError, NewUser, UserProfile, UserStats};
