//! Proxy allocation handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;

use crate::allocator::AllocationResult;
use crate::http::error::ApiError;
use crate::http::middleware::UserContext;
use crate::http::server::AppState;
use crate::model::ProxyType;

/// An allocation plus the ready-made connection line.
#[derive(Debug, Serialize)]
pub struct AllocatedProxy {
    #[serde(flatten)]
    pub allocation: AllocationResult,
    pub connection_string: String,
}

impl From<AllocationResult> for AllocatedProxy {
    fn from(allocation: AllocationResult) -> Self {
        let connection_string = allocation.connection_string();
        Self {
            allocation,
            connection_string,
        }
    }
}

pub async fn allocate(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Result<(StatusCode, Json<Vec<AllocatedProxy>>), ApiError> {
    let results = state.allocator.allocate(ctx.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(results.into_iter().map(AllocatedProxy::from).collect()),
    ))
}

pub async fn allocated(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Json<Vec<AllocatedProxy>> {
    let views = state.allocator.list_allocations(ctx.user_id);
    Json(views.into_iter().map(AllocatedProxy::from).collect())
}

pub async fn release(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Result<StatusCode, ApiError> {
    state.allocator.release(ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn proxy_types() -> Json<[ProxyType; 4]> {
    Json([
        ProxyType::Residential,
        ProxyType::Datacenter,
        ProxyType::Mobile,
        ProxyType::Isp,
    ])
}
