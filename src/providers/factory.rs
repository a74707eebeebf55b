//! Provider construction keyed on the integration's provider type.

use std::sync::Arc;

use url::Url;

use crate::config::AppConfig;
use crate::models::integration::ProviderType;
use crate::providers::config::IntegrationConfig;
use crate::providers::notion::{NOTION_API_BASE, NotionProvider};
use crate::providers::trait_::{ProviderError, RemoteProvider};

/// Builds [`RemoteProvider`] instances from integration rows. Holds the
/// service-level provider settings (base URL override, API version).
#[derive(Debug, Clone)]
pub struct ProviderFactory {
    notion_api_base: Url,
    notion_version: String,
}

impl ProviderFactory {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ProviderError> {
        let notion_api_base = match cfg.notion_api_base.as_deref() {
            Some(base) => {
                // A trailing slash keeps Url::join from eating the last path segment.
                let normalized = if base.ends_with('/') {
                    base.to_string()
                } else {
                    format!("{base}/")
                };
                Url::parse(&normalized)
                    .map_err(|err| ProviderError::Config(format!("invalid Notion base URL: {err}")))?
            }
            None => Url::parse(NOTION_API_BASE)
                .map_err(|err| ProviderError::Config(format!("invalid Notion base URL: {err}")))?,
        };

        Ok(Self {
            notion_api_base,
            notion_version: cfg.notion_version.clone(),
        })
    }

    /// Builds a provider for one integration using its already-decrypted
    /// API key.
    pub fn build(
        &self,
        provider: ProviderType,
        config: &IntegrationConfig,
        api_key: String,
    ) -> Result<Arc<dyn RemoteProvider>, ProviderError> {
        match provider {
            ProviderType::Notion => {
                let provider = NotionProvider::new(
                    api_key,
                    config.clone(),
                    self.notion_api_base.clone(),
                    self.notion_version.clone(),
                )?;
                Ok(Arc::new(provider))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_override_gains_trailing_slash() {
        let cfg = AppConfig {
            notion_api_base: Some("http://127.0.0.1:9999/mock".to_string()),
            ..AppConfig::default()
        };

        let factory = ProviderFactory::from_config(&cfg).unwrap();
        assert_eq!(factory.notion_api_base.as_str(), "http://127.0.0.1:9999/mock/");
    }

    #[test]
    fn builds_notion_provider() {
        let cfg = AppConfig::default();
        let factory = ProviderFactory::from_config(&cfg).unwrap();

        let config = IntegrationConfig::parse(&json!({
            "api_key": "a:b:c:d",
            "database_id": "db-1",
            "board_id": "0b0b0b0b-0b0b-0b0b-0b0b-0b0b0b0b0b0b"
        }))
        .unwrap();

        let provider = factory.build(ProviderType::Notion, &config, "plain-key".to_string());
        assert!(provider.is_ok());
    }
}
