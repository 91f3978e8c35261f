//! API request and response types.

use serde::Serialize;

pub use crate::validation::RegistrationSubmission;

/// Response after a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: String,
    pub message: String,
}

impl RegisterResponse {
    /// Body returned once the homeserver has created the account.
    pub fn created() -> Self {
        Self {
            status: "ok".to_string(),
            message: "account created successfully".to_string(),
        }
    }
}
