//! Validation of submitted registration forms.

use crate::error::GatewayError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Maximum username length accepted by the gateway.
pub const MAX_USERNAME_LEN: usize = 255;

/// Minimum password length accepted by the gateway.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration form as submitted by the browser.
///
/// Missing fields decode as empty strings and are rejected by [`validate`].
#[derive(Deserialize, Default)]
pub struct RegistrationSubmission {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub invite_code: String,
}

/// A validated registration request with a normalized username.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: SecretString,
}

/// Reasons a well-authorized submission is rejected before reaching the homeserver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username and password are required")]
    MissingFields,

    #[error("username must contain only lowercase letters, numbers, dots, underscores, hyphens, equals, and slashes")]
    InvalidUsername,

    #[error("password must be at least 8 characters")]
    PasswordTooShort,
}

/// Normalize a username: surrounding whitespace removed, lower-cased.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Whether a normalized username only uses the localpart characters we accept.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && username.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '=' | '-' | '/')
        })
}

/// Check a submission against the configured invite code and the form rules.
///
/// Rules apply in order and the first failure wins: invite code, then
/// required fields, then username characters, then password length.
pub fn validate(
    submission: RegistrationSubmission,
    invite_code: &SecretString,
) -> Result<RegistrationRequest, GatewayError> {
    if submission.invite_code != *invite_code.expose_secret() {
        return Err(GatewayError::InvalidInviteCode);
    }

    let username = normalize_username(&submission.username);

    if username.is_empty() || submission.password.is_empty() {
        return Err(ValidationError::MissingFields.into());
    }

    if !is_valid_username(&username) {
        return Err(ValidationError::InvalidUsername.into());
    }

    if submission.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort.into());
    }

    Ok(RegistrationRequest {
        username,
        password: SecretString::new(submission.password),
    })
}
