use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const X_API_KEY: &str = "x-api-key";

/// The authenticated caller, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct UserContext {
    pub user_id: u64,
    pub username: String,
}

pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let api_key = match req.headers().get(X_API_KEY).and_then(|v| v.to_str().ok()) {
        Some(key) => key.to_owned(),
        None => return ApiError::Unauthorized("Missing X-API-Key header").into_response(),
    };

    match state.accounts.authenticate(&api_key) {
        Ok(user) => {
            tracing::debug!(user_id = user.id, "Authenticated request");
            req.extensions_mut().insert(UserContext {
                user_id: user.id,
                username: user.username,
            });
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected API key");
            ApiError::from(e).into_response()
        }
    }
}
