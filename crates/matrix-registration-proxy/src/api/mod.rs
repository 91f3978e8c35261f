//! HTTP API for the registration proxy.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::logging_middleware;
pub use types::*;

use crate::config::Config;
use crate::error::GatewayError;
use crate::homeserver::HomeserverClient;
use crate::proxy::{self, Passthrough};
use crate::web;
use axum::{
    middleware as axum_middleware,
    routing::{any, get, post},
    Router,
};
use secrecy::SecretString;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Invite code required to register
    pub invite_code: Arc<SecretString>,
    /// Registration handshake client
    pub homeserver: Arc<HomeserverClient>,
    /// Client for traffic forwarded to the homeserver as-is
    pub passthrough: Arc<Passthrough>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        invite_code: SecretString,
        homeserver: HomeserverClient,
        passthrough: Passthrough,
    ) -> Self {
        Self {
            invite_code: Arc::new(invite_code),
            homeserver: Arc::new(homeserver),
            passthrough: Arc::new(passthrough),
        }
    }

    /// Build state and clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let homeserver = HomeserverClient::new(&config.homeserver_url, config.timeouts.register)?;
        let passthrough = Passthrough::new(&config.homeserver_url, config.timeouts.connect)?;

        Ok(Self::new(config.invite_code.clone(), homeserver, passthrough))
    }
}

/// Create the router: registration API, registration UI, and everything else
/// forwarded to the homeserver.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/register",
            post(handlers::register).fallback(handlers::method_not_allowed),
        )
        // Registration page
        .route("/register", any(web::redirect_to_index))
        .route("/register/", get(web::index))
        .route("/register/*path", get(web::asset))
        // Homeserver pass-through
        .fallback(proxy::forward)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
