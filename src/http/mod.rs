//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, timeout, body limit)
//!     → middleware/user_auth.rs (X-API-Key → UserContext) for /user and /proxy
//!     → user.rs / proxy.rs / admin handlers
//!     → error.rs (domain error → status + {"detail": ...})
//! ```

pub mod error;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;
pub mod user;

pub use error::ApiError;
pub use middleware::{UserContext, X_API_KEY};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
