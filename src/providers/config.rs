//! Per-integration configuration blob.
//!
//! Stored as JSON in `integrations.config`. The structure is plaintext and
//! inspectable; only the `api_key` field holds an encrypted credential token.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{CryptoError, SecretCipher};
use crate::providers::trait_::ProviderError;

/// Current config blob schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Local post fields that can be mapped onto remote properties.
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_STATUS: &str = "status";

/// Which way content flows for an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

impl ConfigDirection {
    pub fn includes_inbound(&self) -> bool {
        matches!(self, ConfigDirection::Inbound | ConfigDirection::Bidirectional)
    }

    pub fn includes_outbound(&self) -> bool {
        matches!(self, ConfigDirection::Outbound | ConfigDirection::Bidirectional)
    }
}

/// Typed view over an integration's JSON config blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Credential cipher token, decrypted only at sync time.
    pub api_key: String,
    pub database_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    pub board_id: Uuid,
    /// Local field name → remote property name.
    #[serde(default = "default_property_mapping")]
    pub property_mapping: BTreeMap<String, String>,
    /// Remote status option ID → local status ID. Inverted for outbound.
    #[serde(default)]
    pub status_mapping: BTreeMap<String, String>,
    #[serde(default = "default_direction")]
    pub direction: ConfigDirection,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_direction() -> ConfigDirection {
    ConfigDirection::Bidirectional
}

fn default_property_mapping() -> BTreeMap<String, String> {
    BTreeMap::from([
        (FIELD_TITLE.to_string(), "Name".to_string()),
        (FIELD_DESCRIPTION.to_string(), "Description".to_string()),
        (FIELD_TAGS.to_string(), "Tags".to_string()),
        (FIELD_STATUS.to_string(), "Status".to_string()),
    ])
}

impl IntegrationConfig {
    /// Parses and validates the config blob of an integration row.
    pub fn parse(value: &serde_json::Value) -> Result<Self, ProviderError> {
        let config: IntegrationConfig = serde_json::from_value(value.clone())
            .map_err(|err| ProviderError::Config(format!("invalid integration config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.version != CONFIG_VERSION {
            return Err(ProviderError::Config(format!(
                "unsupported config version {}, expected {}",
                self.version, CONFIG_VERSION
            )));
        }
        if self.api_key.is_empty() {
            return Err(ProviderError::Config("api_key is empty".to_string()));
        }
        if self.database_id.is_empty() {
            return Err(ProviderError::Config("database_id is empty".to_string()));
        }
        Ok(())
    }

    /// Remote property name configured for a local field, if any.
    pub fn remote_property(&self, field: &str) -> Option<&str> {
        self.property_mapping.get(field).map(String::as_str)
    }

    /// Local status ID for a remote status option.
    pub fn local_status(&self, remote_status_id: &str) -> Option<&str> {
        self.status_mapping.get(remote_status_id).map(String::as_str)
    }

    /// Remote status option ID for a local status, via the inverted mapping.
    pub fn remote_status(&self, local_status_id: &str) -> Option<&str> {
        self.status_mapping
            .iter()
            .find(|(_, local)| local.as_str() == local_status_id)
            .map(|(remote, _)| remote.as_str())
    }

    /// Decrypts the stored API key token.
    pub fn decrypt_api_key(&self, cipher: &SecretCipher) -> Result<String, CryptoError> {
        cipher.decrypt(&self.api_key)
    }
}
