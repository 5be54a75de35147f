//! Lookup surface for the traffic-forwarding gateway.
//!
//! # Data Flow
//! ```text
//! Proxy-Authorization: Basic base64(username_vport:api_key)
//!     → credentials.rs (decode, split username / vport / key)
//!     → resolver.rs (match user + allocation in the committed snapshot)
//!     → GatewayRoute (upstream address and upstream credentials)
//! ```
//!
//! The forwarding itself lives outside this crate.

pub mod credentials;
pub mod resolver;

pub use credentials::{CredentialError, GatewayCredentials};
pub use resolver::{GatewayResolver, GatewayRoute};
