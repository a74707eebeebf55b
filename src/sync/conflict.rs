//! Conflict resolution
//!
//! The only path that returns a conflicted mapping to synced. The caller
//! picks a winning side; the loser is overwritten.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::integration;
use crate::models::integration_mapping::{self, MappingStatus};
use crate::models::integration_sync_log::{LogStatus, SyncDirection};
use crate::providers::config::IntegrationConfig;
use crate::providers::trait_::RemoteProvider;
use crate::repositories::{MappingRepository, PostRepository, SyncLogRepository};
use crate::sync::orchestrator::outbound_payload;

/// Which side wins the conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Local,
    Remote,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("mapping not found")]
    NotFound,
    #[error("mapping is not in conflict")]
    NotInConflict,
    #[error("remote page not found")]
    RemoteGone,
    #[error("provider failure: {0}")]
    Provider(String),
    #[error("local post {0} is missing")]
    LocalMissing(Uuid),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

pub struct ConflictResolver {
    mappings: MappingRepository,
    posts: PostRepository,
    logs: SyncLogRepository,
}

impl ConflictResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            mappings: MappingRepository::new(db.clone()),
            posts: PostRepository::new(db.clone()),
            logs: SyncLogRepository::new(db),
        }
    }

    /// Resolves one conflicted mapping. On provider failure the conflict is
    /// left untouched so resolution can be retried.
    pub async fn resolve(
        &self,
        integration: &integration::Model,
        config: &IntegrationConfig,
        provider: &dyn RemoteProvider,
        mapping_id: Uuid,
        resolution: Resolution,
    ) -> Result<integration_mapping::Model, ResolveError> {
        let mapping = self
            .mappings
            .find_by_id(mapping_id)
            .await?
            .filter(|m| m.integration_id == integration.id)
            .ok_or(ResolveError::NotFound)?;

        if mapping.status != MappingStatus::Conflict.as_str() {
            return Err(ResolveError::NotInConflict);
        }

        let sync_run_id = Uuid::new_v4();

        match resolution {
            Resolution::Local => {
                let local = self
                    .posts
                    .find_by_id(mapping.local_id)
                    .await?
                    .ok_or(ResolveError::LocalMissing(mapping.local_id))?;

                let payload = outbound_payload(&local, config);
                let result = provider
                    .sync_outbound(&payload, Some(&mapping.remote_id))
                    .await;
                if !result.success {
                    return Err(ResolveError::Provider(
                        result.error.unwrap_or_else(|| "push failed".to_string()),
                    ));
                }

                self.finish(integration, &mapping, sync_run_id, SyncDirection::Outbound, "local")
                    .await?;
            }
            Resolution::Remote => {
                let changes = provider
                    .sync_inbound()
                    .await
                    .map_err(|err| ResolveError::Provider(err.to_string()))?;
                let change = changes
                    .into_iter()
                    .find(|change| change.remote_id == mapping.remote_id)
                    .ok_or(ResolveError::RemoteGone)?;

                let status_id = change
                    .remote_status_id
                    .as_deref()
                    .and_then(|remote| config.local_status(remote))
                    .and_then(|local| Uuid::parse_str(local).ok());

                self.posts
                    .apply_remote(mapping.local_id, &change, status_id, Utc::now())
                    .await?;

                self.finish(integration, &mapping, sync_run_id, SyncDirection::Inbound, "remote")
                    .await?;
            }
        }

        self.mappings
            .find_by_id(mapping_id)
            .await?
            .ok_or(ResolveError::NotFound)
    }

    async fn finish(
        &self,
        integration: &integration::Model,
        mapping: &integration_mapping::Model,
        sync_run_id: Uuid,
        direction: SyncDirection,
        winner: &str,
    ) -> Result<(), anyhow::Error> {
        self.mappings
            .mark_synced(mapping.id, None, Utc::now())
            .await?;
        self.logs
            .append(
                integration.id,
                Some(mapping.id),
                sync_run_id,
                direction,
                LogStatus::Success,
                &format!("conflict resolved: {winner} won"),
                Some(json!({
                    "post_id": mapping.local_id,
                    "remote_id": mapping.remote_id,
                    "winner": winner,
                })),
            )
            .await?;
        info!(
            integration_id = %integration.id,
            mapping_id = %mapping.id,
            winner,
            "conflict resolved"
        );
        Ok(())
    }
}
