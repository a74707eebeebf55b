//! # Authentication
//!
//! Bearer-secret verification for the internal cron endpoint. Comparison is
//! constant-time to keep the secret unguessable through timing.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};

/// Extracts the bearer token from the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

/// Validates the presented token against the configured cron secret.
pub fn validate_cron_secret(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let Some(ref secret) = config.cron_secret else {
        return Err(unauthorized(Some("Cron secret not configured")));
    };

    let matches: bool = ConstantTimeEq::ct_eq(token.as_bytes(), secret.as_bytes()).into();
    if matches {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid cron secret")))
    }
}
