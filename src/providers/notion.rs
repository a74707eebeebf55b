//! Notion provider implementation
//!
//! Talks to the Notion REST API: connectivity probe, database discovery,
//! paginated inbound pulls, and page create/update for outbound pushes.
//! Property translation in both directions follows the integration's
//! configured property mapping.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::providers::config::{
    FIELD_DESCRIPTION, FIELD_STATUS, FIELD_TAGS, FIELD_TITLE, IntegrationConfig,
};
use crate::providers::trait_::{
    ConnectionCheck, OutboundResult, PostPayload, ProviderError, RemoteChange, RemoteDatabase,
    RemoteProvider, RemoteProperty, RemoteSchema, RemoteStatusOption,
};

pub const NOTION_API_BASE: &str = "https://api.notion.com/";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u32 = 100;

pub struct NotionProvider {
    http: Client,
    base_url: Url,
    api_key: String,
    version: String,
    database_id: String,
    config: IntegrationConfig,
}

impl std::fmt::Debug for NotionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionProvider")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

impl NotionProvider {
    /// Builds a provider using the decrypted API key and the integration's
    /// property configuration. `base_url` lets tests point at a mock server.
    pub fn new(
        api_key: String,
        config: IntegrationConfig,
        base_url: Url,
        version: String,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(concat!("feedback-integrations/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ProviderError::Config(format!("http client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            version,
            database_id: config.database_id.clone(),
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|err| ProviderError::Config(format!("invalid endpoint {path}: {err}")))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", &self.version)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ProviderError> {
        let res = self.authed(self.http.get(self.endpoint(path)?)).send().await?;
        Self::read_json(res).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let res = self
            .authed(self.http.post(self.endpoint(path)?))
            .json(body)
            .send()
            .await?;
        Self::read_json(res).await
    }

    async fn patch_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let res = self
            .authed(self.http.patch(self.endpoint(path)?))
            .json(body)
            .send()
            .await?;
        Self::read_json(res).await
    }

    async fn read_json(res: reqwest::Response) -> Result<Value, ProviderError> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }
        res.json::<Value>()
            .await
            .map_err(|err| ProviderError::Malformed(format!("invalid JSON body: {err}")))
    }

    /// Translates one Notion page into a [`RemoteChange`] through the
    /// configured property mapping.
    fn parse_page(&self, page: &Value) -> Result<RemoteChange, ProviderError> {
        let remote_id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Malformed("page without id".to_string()))?
            .to_string();

        let properties = page
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| ProviderError::Malformed(format!("page {remote_id} without properties")))?;

        let prop = |field: &str| {
            self.config
                .remote_property(field)
                .and_then(|name| properties.get(name))
        };

        let title = prop(FIELD_TITLE)
            .map(|p| join_rich_text(p.get("title")))
            .unwrap_or_default();
        let description = prop(FIELD_DESCRIPTION)
            .map(|p| join_rich_text(p.get("rich_text")))
            .filter(|text| !text.is_empty());
        let tags = prop(FIELD_TAGS)
            .and_then(|p| p.get("multi_select"))
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|opt| opt.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let remote_status_id = prop(FIELD_STATUS)
            .and_then(|p| p.get("status"))
            .and_then(|status| status.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(RemoteChange {
            remote_id,
            title,
            description,
            tags,
            remote_status_id,
        })
    }

    /// Builds the Notion `properties` object for an outbound push.
    fn build_properties(&self, post: &PostPayload) -> Value {
        let mut properties = serde_json::Map::new();

        if let Some(name) = self.config.remote_property(FIELD_TITLE) {
            properties.insert(
                name.to_string(),
                json!({"title": [{"text": {"content": post.title}}]}),
            );
        }
        if let (Some(name), Some(description)) = (
            self.config.remote_property(FIELD_DESCRIPTION),
            post.description.as_deref(),
        ) {
            properties.insert(
                name.to_string(),
                json!({"rich_text": [{"text": {"content": description}}]}),
            );
        }
        if let Some(name) = self.config.remote_property(FIELD_TAGS) {
            let options: Vec<Value> = post.tags.iter().map(|tag| json!({"name": tag})).collect();
            properties.insert(name.to_string(), json!({"multi_select": options}));
        }
        if let (Some(name), Some(status_id)) = (
            self.config.remote_property(FIELD_STATUS),
            post.remote_status_id.as_deref(),
        ) {
            properties.insert(name.to_string(), json!({"status": {"id": status_id}}));
        }

        Value::Object(properties)
    }
}

fn join_rich_text(fragments: Option<&Value>) -> String {
    fragments
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl RemoteProvider for NotionProvider {
    async fn test_connection(&self) -> ConnectionCheck {
        match self.get_json("v1/users/me").await {
            Ok(_) => ConnectionCheck::ok(),
            Err(err) => {
                debug!(error = %err, "connectivity probe failed");
                ConnectionCheck::failed(err.to_string())
            }
        }
    }

    async fn list_remote_databases(&self) -> Result<Vec<RemoteDatabase>, ProviderError> {
        let mut databases = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": {"property": "object", "value": "database"},
                "page_size": PAGE_SIZE,
            });
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let page = self.post_json("v1/search", &body).await?;
            let results = page
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| ProviderError::Malformed("search without results".to_string()))?;

            for entry in results {
                let Some(id) = entry.get("id").and_then(Value::as_str) else {
                    continue;
                };
                let name = match join_rich_text(entry.get("title")) {
                    title if title.is_empty() => "Untitled".to_string(),
                    title => title,
                };
                databases.push(RemoteDatabase {
                    id: id.to_string(),
                    name,
                });
            }

            if !page.get("has_more").and_then(Value::as_bool).unwrap_or(false) {
                break;
            }
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(databases)
    }

    async fn database_schema(&self, database_id: &str) -> Result<RemoteSchema, ProviderError> {
        let db = self.get_json(&format!("v1/databases/{database_id}")).await?;

        let property_map = db
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| ProviderError::Malformed("database without properties".to_string()))?;

        let mut properties = Vec::new();
        let mut status_options = Vec::new();

        for (name, prop) in property_map {
            let id = prop.get("id").and_then(Value::as_str).unwrap_or_default();
            let kind = prop.get("type").and_then(Value::as_str).unwrap_or_default();

            if kind == "status"
                && let Some(options) = prop
                    .get("status")
                    .and_then(|s| s.get("options"))
                    .and_then(Value::as_array)
            {
                for option in options {
                    if let (Some(id), Some(name)) = (
                        option.get("id").and_then(Value::as_str),
                        option.get("name").and_then(Value::as_str),
                    ) {
                        status_options.push(RemoteStatusOption {
                            id: id.to_string(),
                            name: name.to_string(),
                        });
                    }
                }
            }

            properties.push(RemoteProperty {
                id: id.to_string(),
                name: name.clone(),
                kind: kind.to_string(),
            });
        }

        Ok(RemoteSchema {
            properties,
            status_options,
        })
    }

    async fn sync_inbound(&self) -> Result<Vec<RemoteChange>, ProviderError> {
        let mut changes = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({"page_size": PAGE_SIZE});
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let page = self
                .post_json(&format!("v1/databases/{}/query", self.database_id), &body)
                .await?;
            let results = page
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| ProviderError::Malformed("query without results".to_string()))?;

            for entry in results {
                changes.push(self.parse_page(entry)?);
            }

            if !page.get("has_more").and_then(Value::as_bool).unwrap_or(false) {
                break;
            }
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(changes)
    }

    async fn sync_outbound(&self, post: &PostPayload, remote_id: Option<&str>) -> OutboundResult {
        let properties = self.build_properties(post);

        let outcome = match remote_id {
            None => {
                let body = json!({
                    "parent": {"database_id": self.database_id},
                    "properties": properties,
                });
                self.post_json("v1/pages", &body).await
            }
            Some(id) => {
                let body = json!({"properties": properties});
                self.patch_json(&format!("v1/pages/{id}"), &body).await
            }
        };

        match outcome {
            Ok(page) => {
                let created_id = page
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| remote_id.map(str::to_string));
                OutboundResult::ok(created_id)
            }
            Err(err) => {
                warn!(error = %err, "outbound push failed");
                OutboundResult::failed(err.to_string())
            }
        }
    }
}
