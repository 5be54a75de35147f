//! Registration and per-user account handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::accounts::{NewUser, UserProfile, UserStats};
use crate::http::error::ApiError;
use crate::http::middleware::UserContext;
use crate::http::server::AppState;
use crate::model::Subscription;
use crate::plans::PlanTier;

#[derive(Debug, Deserialize)]
pub struct PlanChange {
    pub plan: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user = state.accounts.register(new).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.accounts.user(ctx.user_id)?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn subscription(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Result<Json<Subscription>, ApiError> {
    Ok(Json(state.accounts.subscription(ctx.user_id)?))
}

/// Unknown plan names fall back to STARTER.
pub async fn change_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Json(body): Json<PlanChange>,
) -> Result<Json<Subscription>, ApiError> {
    let tier = PlanTier::parse_or_default(&body.plan);
    if !tier.as_str().eq_ignore_ascii_case(body.plan.trim()) {
        tracing::warn!(user_id = ctx.user_id, requested = %body.plan, "Unknown plan, using STARTER");
    }
    Ok(Json(state.accounts.change_plan(ctx.user_id, tier).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.accounts.stats(ctx.user_id)?))
}
