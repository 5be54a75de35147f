//! Operator API, mounted only when `admin.enabled` is set.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pool", get(list_pool).post(add_pool_entries))
        .route("/admin/pool/{id}/active", post(set_pool_entry_active))
        .route("/admin/stats", get(get_stats))
        .route("/admin/gateway/resolve", get(resolve_gateway))
        .route("/admin/usage", post(record_usage))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
