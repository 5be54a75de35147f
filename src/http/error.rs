//! Mapping of domain errors to HTTP responses.
//!
//! Bodies are `{"detail": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::accounts::AccountError;
use crate::allocator::AllocationError;
use crate::gateway::CredentialError;
use crate::pool::PoolError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Allocation(e) => match e {
                AllocationError::NoSubscription | AllocationError::SubscriptionExpired => StatusCode::FORBIDDEN,
                AllocationError::AlreadyAllocated => StatusCode::CONFLICT,
                AllocationError::InsufficientCapacity { .. } | AllocationError::PortsExhausted { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AllocationError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            },
            ApiError::Account(e) => match e {
                AccountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AccountError::UsernameTaken | AccountError::EmailTaken => StatusCode::CONFLICT,
                AccountError::UnknownUser(_) => StatusCode::NOT_FOUND,
                AccountError::InvalidApiKey => StatusCode::UNAUTHORIZED,
                AccountError::UserInactive => StatusCode::FORBIDDEN,
            },
            ApiError::Pool(e) => match e {
                PoolError::InvalidEntry { .. } | PoolError::Parse(_) => StatusCode::BAD_REQUEST,
                PoolError::UnknownEntry(_) => StatusCode::NOT_FOUND,
                PoolError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Credential(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::from(AllocationError::InsufficientCapacity { requested: 5, available: 3 });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::from(AllocationError::AlreadyAllocated).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(AllocationError::NotImplemented("x")).status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(ApiError::from(AllocationError::SubscriptionExpired).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AccountError::EmailTaken).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(PoolError::UnknownEntry(3)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CredentialError::InvalidHeader).status(), StatusCode::BAD_REQUEST);
    }
}
