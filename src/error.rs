//! Error types for the gateway
//!
//! Provides unified error handling using thiserror. Every variant renders as
//! the `{status, message}` JSON envelope.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorEnvelope;
use crate::provider::ProviderError;

// == Gateway Error Enum ==
/// Unified error type for the gateway.
///
/// `Clone` so that a single upstream outcome can be handed to every waiter
/// coalesced onto the same fetch.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Missing or malformed request parameter
    #[error("{0}")]
    InvalidRequest(String),

    /// No route matched
    #[error("{0}")]
    NotFound(String),

    /// The upstream fetcher failed
    #[error("{0}")]
    UpstreamFailure(Arc<anyhow::Error>),

    /// The cache store could not be read or written
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Process-level fault that triggered a shutdown
    #[error("Lifecycle fault: {0}")]
    LifecycleFault(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Wraps a fetcher failure.
    pub fn upstream(err: anyhow::Error) -> Self {
        GatewayError::UpstreamFailure(Arc::new(err))
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::UpstreamFailure(err) => err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ProviderError>())
                .map(|provider| provider.status)
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            GatewayError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::LifecycleFault(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal details stay in the logs
            GatewayError::LifecycleFault(_) | GatewayError::Internal(_) => {
                tracing::error!("{}", self);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorEnvelope::new(status, message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the gateway.
pub type Result<T> = std::result::Result<T, GatewayError>;
