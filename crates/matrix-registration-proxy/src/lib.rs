//! Matrix Registration Proxy - invite-code gated account registration.
//!
//! This proxy sits in front of a Matrix homeserver to:
//! - Serve a self-service registration page
//! - Check an invite code before any account is created
//! - Complete the homeserver's registration-token challenge on the user's behalf
//! - Forward all other traffic to the homeserver untouched

pub mod api;
pub mod config;
pub mod error;
pub mod homeserver;
pub mod proxy;
pub mod validation;
pub mod web;

pub use config::Config;
pub use error::{GatewayError, UpstreamFault};
pub use homeserver::{HomeserverClient, RegistrationOutcome};
pub use validation::{validate, RegistrationRequest, RegistrationSubmission};
