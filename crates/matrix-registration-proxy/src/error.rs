//! Error types for the registration proxy.

use crate::validation::ValidationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Faults on the homeserver side of the gateway.
///
/// The detail is for server-side logs only; callers get a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamFault {
    /// The homeserver could not be reached or the exchange broke off.
    #[error("homeserver unreachable: {0}")]
    Transport(String),

    /// The homeserver answered, but not in the shape the handshake expects.
    #[error("unexpected homeserver response: {0}")]
    Protocol(String),
}

impl UpstreamFault {
    /// Message safe to return to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            UpstreamFault::Transport(_) => "failed to contact homeserver",
            UpstreamFault::Protocol(_) => "unexpected response from homeserver",
        }
    }
}

/// Gateway error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid invite code")]
    InvalidInviteCode,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid request body")]
    InvalidRequestBody,

    #[error("{message}")]
    Homeserver { status: u16, message: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamFault),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::InvalidInviteCode => (StatusCode::FORBIDDEN, self.to_string()),
            GatewayError::Validation(_) | GatewayError::InvalidRequestBody => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            GatewayError::Homeserver { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                message.clone(),
            ),
            // Logged with detail where the fault is detected.
            GatewayError::Upstream(fault) => {
                (StatusCode::BAD_GATEWAY, fault.public_message().to_string())
            }
            GatewayError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            GatewayError::Internal(detail) => {
                error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Upstream(UpstreamFault::Transport(e.to_string()))
    }
}
