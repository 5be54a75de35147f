pub mod metrics;
pub mod user_auth;

pub use self::metrics::track_metrics;
pub use self::user_auth::{user_auth_middleware, UserContext, X_API_KEY};
