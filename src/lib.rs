//! ProxyFlow: proxy pool allocation service.
//!
//! Users register, pick a plan, and get a batch of upstream proxies from a
//! shared pool. Every allocated proxy is exposed through one gateway on a
//! unique virtual port.
//!
//! # Architecture Overview
//!
//! ```text
//!     HTTP request
//!         → http (axum router, request id, auth)
//!         → accounts / allocator / pool / gateway
//!         → store (copy-on-write snapshot, serialized writers, JSON file)
//!
//!     Cross-cutting: config (TOML + hot reload), observability
//!     (tracing + Prometheus), lifecycle (signals, graceful shutdown)
//! ```

// Domain
pub mod model;
pub mod plans;
pub mod store;

// Services
pub mod accounts;
pub mod allocator;
pub mod gateway;
pub mod pool;

// Surfaces
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use allocator::{AllocationError, AllocationResult, Allocator};
pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use store::Store;
