//! Wire types for the homeserver registration endpoint.

use crate::error::UpstreamFault;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Auth stage type used to prove possession of the invite code.
pub const REGISTRATION_TOKEN_STAGE: &str = "m.login.registration_token";

/// Body of `POST /_matrix/client/v3/register`.
#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthData<'a>>,
}

/// Registration-token auth stage.
#[derive(Debug, Serialize)]
pub struct AuthData<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub token: &'a str,
    pub session: &'a str,
}

/// 401 challenge body. Only `session` decides the outcome; `flows` is kept
/// untyped for logging.
#[derive(Debug, Default, Deserialize)]
pub struct UiaChallenge {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub flows: Option<serde_json::Value>,
}

/// Matrix error body. Only `error` is passed on.
#[derive(Debug, Deserialize)]
pub struct MatrixError {
    pub error: String,
}

/// Opaque session id issued by the homeserver with a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiaSession(pub String);

impl UiaSession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of one registration call or of the whole handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The account was created.
    Success,
    /// The homeserver requires an auth stage for this session.
    Challenged(UiaSession),
    /// The homeserver rejected the registration.
    ClientError { message: String, status: u16 },
    /// The homeserver could not be reached or answered unexpectedly.
    ServerUnreachable(UpstreamFault),
}

/// Fallback message when a rejection carries no usable `error` field.
pub const GENERIC_FAILURE: &str = "registration failed";

impl RegistrationOutcome {
    /// Classify a non-200 response other than a challenge.
    pub fn rejected(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<MatrixError>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| GENERIC_FAILURE.to_string());

        RegistrationOutcome::ClientError { message, status }
    }

    /// Classify a 401 challenge body.
    pub fn challenged(body: &[u8]) -> Self {
        match serde_json::from_slice::<UiaChallenge>(body) {
            Ok(challenge) => {
                debug!(flows = ?challenge.flows, "Registration challenge");

                match challenge.session {
                    Some(session) if !session.is_empty() => {
                        RegistrationOutcome::Challenged(UiaSession(session))
                    }
                    _ => RegistrationOutcome::ServerUnreachable(UpstreamFault::Protocol(
                        "challenge without a session id".into(),
                    )),
                }
            }
            Err(e) => RegistrationOutcome::ServerUnreachable(UpstreamFault::Protocol(format!(
                "unparseable challenge body: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_body_has_no_auth() {
        let body = RegisterBody {
            username: "alice",
            password: "longenough1",
            auth: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"username": "alice", "password": "longenough1"})
        );
    }

    #[test]
    fn test_completion_body_shape() {
        let body = RegisterBody {
            username: "alice",
            password: "longenough1",
            auth: Some(AuthData {
                kind: REGISTRATION_TOKEN_STAGE,
                token: "secret",
                session: "abc",
            }),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "username": "alice",
                "password": "longenough1",
                "auth": {
                    "type": "m.login.registration_token",
                    "token": "secret",
                    "session": "abc"
                }
            })
        );
    }

    #[test]
    fn test_challenged_extracts_session() {
        let body = json!({
            "session": "abc",
            "flows": [{"stages": ["m.login.registration_token"]}],
            "params": {}
        });
        assert_eq!(
            RegistrationOutcome::challenged(body.to_string().as_bytes()),
            RegistrationOutcome::Challenged(UiaSession("abc".into()))
        );
    }

    #[test]
    fn test_challenged_ignores_flows_shape() {
        for body in [
            r#"{"session": "abc", "flows": null}"#,
            r#"{"session": "abc", "flows": {"stages": ["m.login.registration_token"]}}"#,
            r#"{"session": "abc", "flows": "m.login.registration_token"}"#,
        ] {
            assert_eq!(
                RegistrationOutcome::challenged(body.as_bytes()),
                RegistrationOutcome::Challenged(UiaSession("abc".into())),
                "body {body:?}"
            );
        }
    }

    #[test]
    fn test_challenge_without_session_is_protocol_fault() {
        for body in [r#"{"flows": []}"#, r#"{"session": ""}"#, "not json", ""] {
            assert!(
                matches!(
                    RegistrationOutcome::challenged(body.as_bytes()),
                    RegistrationOutcome::ServerUnreachable(UpstreamFault::Protocol(_))
                ),
                "body {body:?}"
            );
        }
    }

    #[test]
    fn test_rejected_passes_error_through() {
        let body = json!({"errcode": "M_USER_IN_USE", "error": "User ID already taken."});
        assert_eq!(
            RegistrationOutcome::rejected(400, body.to_string().as_bytes()),
            RegistrationOutcome::ClientError {
                message: "User ID already taken.".into(),
                status: 400
            }
        );
    }

    #[test]
    fn test_rejected_ignores_errcode_shape() {
        for body in [
            r#"{"errcode": 42, "error": "User ID already taken."}"#,
            r#"{"errcode": null, "error": "User ID already taken."}"#,
            r#"{"error": "User ID already taken."}"#,
        ] {
            assert_eq!(
                RegistrationOutcome::rejected(400, body.as_bytes()),
                RegistrationOutcome::ClientError {
                    message: "User ID already taken.".into(),
                    status: 400
                },
                "body {body:?}"
            );
        }
    }

    #[test]
    fn test_rejected_without_error_field_is_generic() {
        for body in [r#"{"errcode": "M_UNKNOWN"}"#, r#"{"error": 42}"#, "<html>oops</html>"] {
            assert_eq!(
                RegistrationOutcome::rejected(500, body.as_bytes()),
                RegistrationOutcome::ClientError {
                    message: GENERIC_FAILURE.into(),
                    status: 500
                }
            );
        }
    }
}
