//! Homeserver client for the registration handshake.

use super::types::{
    AuthData, RegisterBody, RegistrationOutcome, UiaSession, REGISTRATION_TOKEN_STAGE,
};
use crate::error::{GatewayError, UpstreamFault};
use crate::validation::RegistrationRequest;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Path of the client-server registration endpoint.
pub const REGISTER_PATH: &str = "/_matrix/client/v3/register";

/// Where a single registration attempt stands.
#[derive(Debug)]
enum Handshake {
    /// Registering without an auth stage to learn whether one is needed.
    Probing,
    /// Answering the challenge for this session with the registration token.
    Completing(UiaSession),
    /// Finished.
    Done(RegistrationOutcome),
}

/// Client driving the registration-token handshake against a homeserver.
#[derive(Clone)]
pub struct HomeserverClient {
    client: Client,
    register_url: String,
}

impl HomeserverClient {
    /// Create a new homeserver client.
    ///
    /// `timeout` bounds each registration call, connect to last byte.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into();
        Ok(Self {
            client,
            register_url: format!("{}{}", base_url.trim_end_matches('/'), REGISTER_PATH),
        })
    }

    /// URL registration calls are sent to.
    pub fn register_url(&self) -> &str {
        &self.register_url
    }

    /// Register an account, answering a registration-token challenge if one is issued.
    ///
    /// Never returns [`RegistrationOutcome::Challenged`]. Each step is tried once.
    #[instrument(skip(self, request, invite_code), fields(username = %request.username))]
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        invite_code: &SecretString,
    ) -> RegistrationOutcome {
        let mut state = Handshake::Probing;

        loop {
            state = match state {
                Handshake::Probing => match self.probe(request).await {
                    RegistrationOutcome::Challenged(session) => {
                        debug!("Challenge received, completing with registration token");
                        Handshake::Completing(session)
                    }
                    outcome => Handshake::Done(outcome),
                },
                Handshake::Completing(session) => {
                    Handshake::Done(self.complete(request, invite_code, &session).await)
                }
                Handshake::Done(outcome) => {
                    if outcome == RegistrationOutcome::Success {
                        info!("Account registered");
                    }
                    return outcome;
                }
            };
        }
    }

    /// First call: no auth stage.
    async fn probe(&self, request: &RegistrationRequest) -> RegistrationOutcome {
        let body = RegisterBody {
            username: &request.username,
            password: request.password.expose_secret(),
            auth: None,
        };

        let (status, body) = match self.post(&body).await {
            Ok(response) => response,
            Err(fault) => return RegistrationOutcome::ServerUnreachable(fault),
        };

        match status {
            StatusCode::OK => {
                debug!("Registration succeeded without a challenge");
                RegistrationOutcome::Success
            }
            StatusCode::UNAUTHORIZED => {
                let outcome = RegistrationOutcome::challenged(&body);
                if let RegistrationOutcome::ServerUnreachable(fault) = &outcome {
                    warn!(error = %fault, body = %excerpt(&body), "Malformed registration challenge");
                }
                outcome
            }
            _ => {
                warn!(status = %status, body = %excerpt(&body), "Homeserver rejected registration");
                RegistrationOutcome::rejected(status.as_u16(), &body)
            }
        }
    }

    /// Second call: registration-token stage for the challenged session.
    async fn complete(
        &self,
        request: &RegistrationRequest,
        invite_code: &SecretString,
        session: &UiaSession,
    ) -> RegistrationOutcome {
        let body = RegisterBody {
            username: &request.username,
            password: request.password.expose_secret(),
            auth: Some(AuthData {
                kind: REGISTRATION_TOKEN_STAGE,
                token: invite_code.expose_secret(),
                session: session.as_str(),
            }),
        };

        let (status, body) = match self.post(&body).await {
            Ok(response) => response,
            Err(fault) => return RegistrationOutcome::ServerUnreachable(fault),
        };

        if status == StatusCode::OK {
            return RegistrationOutcome::Success;
        }

        warn!(status = %status, body = %excerpt(&body), "Homeserver rejected registration token");
        RegistrationOutcome::rejected(status.as_u16(), &body)
    }

    /// POST a registration body and read the whole response.
    async fn post(&self, body: &RegisterBody<'_>) -> Result<(StatusCode, Vec<u8>), UpstreamFault> {
        let response = self
            .client
            .post(&self.register_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %self.register_url, "Failed to contact homeserver");
                UpstreamFault::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(status = %status, error = %e, "Failed to read homeserver response body");
                Vec::new()
            }
        };

        Ok((status, body))
    }
}

/// Short, printable prefix of a response body for logs.
fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(200).collect()
}
