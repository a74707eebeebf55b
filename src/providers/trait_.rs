//! Remote provider trait definition
//!
//! Defines the interface every remote provider implementation must follow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-specific error types for structured error handling.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Classifies a non-success upstream status, treating credential
    /// failures separately from other HTTP errors.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth(format!("status {}: {}", status, body)),
            _ => ProviderError::Http { status, body },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<ProviderError> for crate::error::ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Http { status, body } => {
                crate::error::provider_error("notion".to_string(), status, Some(body))
            }
            ProviderError::Config(message) => crate::error::validation_error(
                &format!("Invalid integration configuration: {message}"),
                serde_json::Value::Null,
            ),
            other => crate::error::provider_error("notion".to_string(), 0, Some(other.to_string())),
        }
    }
}

/// Outcome of a connectivity probe. Failures are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConnectionCheck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionCheck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A syncable container on the remote side (a Notion database).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RemoteDatabase {
    pub id: String,
    pub name: String,
}

/// A single property of a remote database schema.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RemoteProperty {
    pub id: String,
    pub name: String,
    /// Provider-native property type (e.g. "title", "multi_select").
    pub kind: String,
}

/// One selectable status option on the remote side.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RemoteStatusOption {
    pub id: String,
    pub name: String,
}

/// Schema of a remote database, used during integration setup.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RemoteSchema {
    pub properties: Vec<RemoteProperty>,
    pub status_options: Vec<RemoteStatusOption>,
}

/// One remote item observed during an inbound pull.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub remote_id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Provider-side status option ID, mapped to a local status by the caller.
    pub remote_status_id: Option<String>,
}

/// Local post content pushed outbound. Status is pre-mapped to the remote
/// option ID by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPayload {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub remote_status_id: Option<String>,
}

/// Outcome of one outbound push. Failures are data, not errors.
#[derive(Debug, Clone)]
pub struct OutboundResult {
    pub success: bool,
    pub remote_id: Option<String>,
    pub error: Option<String>,
}

impl OutboundResult {
    pub fn ok(remote_id: Option<String>) -> Self {
        Self {
            success: true,
            remote_id,
            error: None,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            remote_id: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Probe connectivity and credentials. Never returns `Err`; failures are
    /// reported through [`ConnectionCheck`].
    async fn test_connection(&self) -> ConnectionCheck;

    /// List syncable remote databases (setup-time discovery).
    async fn list_remote_databases(&self) -> Result<Vec<RemoteDatabase>, ProviderError>;

    /// Fetch the schema of one remote database (setup-time discovery).
    async fn database_schema(&self, database_id: &str) -> Result<RemoteSchema, ProviderError>;

    /// Pull the full current remote state, paginating internally.
    async fn sync_inbound(&self) -> Result<Vec<RemoteChange>, ProviderError>;

    /// Push one post to the remote side. Creates when `remote_id` is `None`,
    /// updates otherwise. Never returns `Err`; failures are reported through
    /// [`OutboundResult`].
    async fn sync_outbound(&self, post: &PostPayload, remote_id: Option<&str>) -> OutboundResult;
}
