//! HTTP request handlers.

use super::types::{RegisterResponse, RegistrationSubmission};
use super::AppState;
use crate::error::{GatewayError, UpstreamFault};
use crate::homeserver::RegistrationOutcome;
use crate::validation::validate;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    Json,
};
use tracing::{debug, info, warn};

/// Register a new account on the homeserver.
///
/// The body is decoded as JSON whatever its content type.
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RegisterResponse>, GatewayError> {
    let submission: RegistrationSubmission = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "Undecodable registration body");
        GatewayError::InvalidRequestBody
    })?;

    let request = validate(submission, &state.invite_code).inspect_err(|e| {
        debug!(error = %e, "Registration rejected before contacting homeserver")
    })?;

    info!(username = %request.username, "Registration request received");

    let outcome = state
        .homeserver
        .register(&request, &state.invite_code)
        .await;

    translate(outcome)
}

/// Any method other than POST on the registration endpoint.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        [(header::ALLOW, HeaderValue::from_static("POST"))],
        GatewayError::MethodNotAllowed,
    )
}

/// Map a finished handshake to the response sent to the browser.
pub fn translate(outcome: RegistrationOutcome) -> Result<Json<RegisterResponse>, GatewayError> {
    match outcome {
        RegistrationOutcome::Success => Ok(Json(RegisterResponse::created())),
        RegistrationOutcome::ClientError { message, status } => {
            Err(GatewayError::Homeserver { status, message })
        }
        RegistrationOutcome::ServerUnreachable(fault) => Err(fault.into()),
        RegistrationOutcome::Challenged(_) => {
            let fault = UpstreamFault::Protocol("handshake ended on an unanswered challenge".into());
            warn!(error = %fault, "Upstream fault");
            Err(fault.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homeserver::UiaSession;

    #[test]
    fn test_translate_success() {
        let Json(body) = translate(RegistrationOutcome::Success).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.message, "account created successfully");
    }

    #[test]
    fn test_translate_client_error_keeps_status_and_message() {
        let err = translate(RegistrationOutcome::ClientError {
            message: "User ID already taken.".into(),
            status: 400,
        })
        .unwrap_err();

        match err {
            GatewayError::Homeserver { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "User ID already taken.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_translate_faults_are_upstream_errors() {
        let err = translate(RegistrationOutcome::ServerUnreachable(UpstreamFault::Transport(
            "connection refused".into(),
        )))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(UpstreamFault::Transport(_))));

        let err = translate(RegistrationOutcome::Challenged(UiaSession("abc".into()))).unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(UpstreamFault::Protocol(_))));
    }
}
