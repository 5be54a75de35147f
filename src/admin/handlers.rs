use axum::{
    extract::{Path, State},
    http::{header::PROXY_AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::gateway::{GatewayCredentials, GatewayRoute};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::model::{NewPoolEntry, ProxyPoolEntry};
use crate::pool::PoolStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub users: usize,
    pub allocations: usize,
    pub pool_entries: usize,
}

#[derive(Deserialize)]
pub struct ActiveToggle {
    pub active: bool,
}

/// Traffic the forwarding layer observed for one user.
#[derive(Deserialize)]
pub struct UsageReport {
    pub user_id: u64,
    pub bytes: u64,
}

#[derive(Serialize)]
pub struct UsageRecorded {
    pub user_id: u64,
    pub data_used_gb: f64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.store.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        users: snapshot.users.len(),
        allocations: snapshot.allocations.len(),
        pool_entries: snapshot.pool.len(),
    })
}

pub async fn list_pool(State(state): State<AppState>) -> Json<Vec<ProxyPoolEntry>> {
    Json(state.pool.entries())
}

/// Adds the whole batch or nothing.
pub async fn add_pool_entries(
    State(state): State<AppState>,
    Json(entries): Json<Vec<NewPoolEntry>>,
) -> Result<(StatusCode, Json<Vec<ProxyPoolEntry>>), ApiError> {
    let added = state.pool.add_entries(entries).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn set_pool_entry_active(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(toggle): Json<ActiveToggle>,
) -> Result<Json<ProxyPoolEntry>, ApiError> {
    Ok(Json(state.pool.set_active(id, toggle.active).await?))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<PoolStats> {
    Json(state.pool.stats())
}

/// Resolve the `Proxy-Authorization` header a gateway client would send.
pub async fn resolve_gateway(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GatewayRoute>, ApiError> {
    let header = headers
        .get(PROXY_AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized("Missing Proxy-Authorization header"))?;
    let creds = GatewayCredentials::from_basic_header(header)?;

    state
        .resolver
        .resolve(&creds)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No allocation on port {} for {}", creds.vport, creds.username)))
}

pub async fn record_usage(
    State(state): State<AppState>,
    Json(report): Json<UsageReport>,
) -> Result<Json<UsageRecorded>, ApiError> {
    let data_used_gb = state.accounts.record_data_usage(report.user_id, report.bytes).await?;
    Ok(Json(UsageRecorded {
        user_id: report.user_id,
        data_used_gb,
    }))
}
