//! Sync orchestrator
//!
//! Drives one sync run for one integration as a small state machine:
//! connectivity gate, inbound phase, phase marker, outbound phase, then the
//! post-run timestamp. Item failures are isolated into log rows; only a
//! failed connectivity gate aborts the run, and it does so before any
//! mutation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::integration;
use crate::models::integration_mapping::{self, LOCAL_TYPE_POST, MappingStatus};
use crate::models::integration_sync_log::{LogStatus, SyncDirection};
use crate::models::post;
use crate::providers::config::IntegrationConfig;
use crate::providers::trait_::{PostPayload, RemoteChange, RemoteProvider};
use crate::repositories::{
    IntegrationRepository, MappingRepository, PostRepository, RunSummary, SyncLogRepository,
};
use crate::sync::SyncRunError;

/// Result of one completed orchestrator run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub sync_run_id: Uuid,
    pub summary: RunSummary,
}

pub struct SyncOrchestrator {
    integrations: IntegrationRepository,
    mappings: MappingRepository,
    posts: PostRepository,
    logs: SyncLogRepository,
    skew_tolerance: Duration,
}

impl SyncOrchestrator {
    pub fn new(db: Arc<DatabaseConnection>, skew_tolerance_seconds: u64) -> Self {
        Self {
            integrations: IntegrationRepository::new(db.clone()),
            mappings: MappingRepository::new(db.clone()),
            posts: PostRepository::new(db.clone()),
            logs: SyncLogRepository::new(db),
            skew_tolerance: Duration::seconds(skew_tolerance_seconds as i64),
        }
    }

    /// Runs one full sync for `integration` against an already-built
    /// provider. The caller guarantees no concurrent run for the same
    /// integration; the mapping unique index backstops races regardless.
    pub async fn run(
        &self,
        integration: &integration::Model,
        config: &IntegrationConfig,
        provider: &dyn RemoteProvider,
    ) -> Result<SyncOutcome, SyncRunError> {
        let check = provider.test_connection().await;
        if !check.success {
            return Err(SyncRunError::Connection(
                check.error.unwrap_or_else(|| "connection failed".to_string()),
            ));
        }

        let sync_run_id = Uuid::new_v4();
        info!(
            integration_id = %integration.id,
            %sync_run_id,
            direction = ?config.direction,
            "starting sync run"
        );

        if config.direction.includes_inbound() {
            self.run_inbound(integration, config, provider, sync_run_id)
                .await?;
        }

        if config.direction.includes_inbound() && config.direction.includes_outbound() {
            self.logs
                .append_phase_marker(integration.id, sync_run_id)
                .await?;
        }

        if config.direction.includes_outbound() {
            self.run_outbound(integration, config, provider, sync_run_id)
                .await?;
        }

        // The run happened, item failures included.
        self.integrations
            .touch_last_sync(integration.id, Utc::now())
            .await?;

        let summary = self.logs.run_summary(sync_run_id).await?;
        info!(
            integration_id = %integration.id,
            %sync_run_id,
            items = summary.items,
            successes = summary.successes,
            errors = summary.errors,
            conflicts = summary.conflicts,
            "sync run finished"
        );

        Ok(SyncOutcome {
            sync_run_id,
            summary,
        })
    }

    async fn run_inbound(
        &self,
        integration: &integration::Model,
        config: &IntegrationConfig,
        provider: &dyn RemoteProvider,
        sync_run_id: Uuid,
    ) -> Result<(), SyncRunError> {
        let changes = match provider.sync_inbound().await {
            Ok(changes) => changes,
            Err(err) => {
                // A failed bulk pull is a phase-level error, not a run abort;
                // the outbound phase still gets its chance.
                warn!(integration_id = %integration.id, error = %err, "inbound pull failed");
                self.logs
                    .append(
                        integration.id,
                        None,
                        sync_run_id,
                        SyncDirection::Inbound,
                        LogStatus::Error,
                        "inbound pull failed",
                        Some(json!({"error": err.to_string()})),
                    )
                    .await?;
                return Ok(());
            }
        };

        for change in &changes {
            if let Err(err) = self
                .apply_inbound_change(integration, config, change, sync_run_id)
                .await
            {
                warn!(
                    integration_id = %integration.id,
                    remote_id = %change.remote_id,
                    error = %err,
                    "inbound item failed"
                );
                self.logs
                    .append(
                        integration.id,
                        None,
                        sync_run_id,
                        SyncDirection::Inbound,
                        LogStatus::Error,
                        "inbound item failed",
                        Some(json!({
                            "remote_id": change.remote_id,
                            "error": err.to_string(),
                        })),
                    )
                    .await?;
            }
        }

        Ok(())
    }

    async fn apply_inbound_change(
        &self,
        integration: &integration::Model,
        config: &IntegrationConfig,
        change: &RemoteChange,
        sync_run_id: Uuid,
    ) -> anyhow::Result<()> {
        let status_id = change
            .remote_status_id
            .as_deref()
            .and_then(|remote| config.local_status(remote))
            .and_then(|local| Uuid::parse_str(local).ok());

        let existing = self
            .mappings
            .find_by_remote(integration.id, &change.remote_id)
            .await?;

        match existing {
            None => {
                let created = self
                    .posts
                    .create_from_remote(integration.tenant_id, config.board_id, change, status_id)
                    .await?;
                let mapping = self
                    .mappings
                    .create(
                        integration.id,
                        LOCAL_TYPE_POST,
                        created.id,
                        &change.remote_id,
                        "inbound",
                        MappingStatus::Synced,
                    )
                    .await?;
                self.logs
                    .append(
                        integration.id,
                        Some(mapping.id),
                        sync_run_id,
                        SyncDirection::Inbound,
                        LogStatus::Success,
                        "created local post from remote item",
                        Some(json!({"post_id": created.id, "remote_id": change.remote_id})),
                    )
                    .await?;
            }
            Some(mapping) => {
                let Some(local) = self.posts.find_by_id(mapping.local_id).await? else {
                    anyhow::bail!("mapped local post {} is missing", mapping.local_id);
                };

                if self.locally_modified(&mapping, &local) {
                    let fields = differing_fields(&local, change, status_id);
                    let detail = format!("local and remote diverged: {}", fields.join(", "));
                    self.mappings.mark_conflict(mapping.id, &detail).await?;
                    self.logs
                        .append(
                            integration.id,
                            Some(mapping.id),
                            sync_run_id,
                            SyncDirection::Inbound,
                            LogStatus::Conflict,
                            &detail,
                            Some(json!({
                                "post_id": local.id,
                                "remote_id": change.remote_id,
                                "fields": fields,
                            })),
                        )
                        .await?;
                } else {
                    let now = Utc::now();
                    self.posts
                        .apply_remote(local.id, change, status_id, now)
                        .await?;
                    self.mappings.mark_synced(mapping.id, None, now).await?;
                    self.logs
                        .append(
                            integration.id,
                            Some(mapping.id),
                            sync_run_id,
                            SyncDirection::Inbound,
                            LogStatus::Success,
                            "applied remote changes to local post",
                            Some(json!({"post_id": local.id, "remote_id": change.remote_id})),
                        )
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// A post edited after the mapping's last sync (plus clock-skew
    /// tolerance) counts as locally modified. A never-synced mapping counts
    /// as unmodified.
    fn locally_modified(
        &self,
        mapping: &integration_mapping::Model,
        local: &post::Model,
    ) -> bool {
        let Some(last_synced) = mapping.last_synced_at else {
            return false;
        };
        let threshold: DateTime<Utc> = last_synced.with_timezone(&Utc) + self.skew_tolerance;
        local.updated_at.with_timezone(&Utc) > threshold
    }

    async fn run_outbound(
        &self,
        integration: &integration::Model,
        config: &IntegrationConfig,
        provider: &dyn RemoteProvider,
        sync_run_id: Uuid,
    ) -> Result<(), SyncRunError> {
        let mappings = self.mappings.list_for_integration(integration.id).await?;

        for mapping in mappings {
            if mapping.local_type != LOCAL_TYPE_POST {
                continue;
            }
            // Conflicted mappings wait for explicit resolution.
            if mapping.status == MappingStatus::Conflict.as_str() {
                self.logs
                    .append(
                        integration.id,
                        Some(mapping.id),
                        sync_run_id,
                        SyncDirection::Outbound,
                        LogStatus::Skipped,
                        "skipped: pending conflict",
                        Some(json!({"post_id": mapping.local_id})),
                    )
                    .await?;
                continue;
            }

            let Some(local) = self.posts.find_by_id(mapping.local_id).await? else {
                self.mappings
                    .mark_error(mapping.id, "local post missing")
                    .await?;
                self.logs
                    .append(
                        integration.id,
                        Some(mapping.id),
                        sync_run_id,
                        SyncDirection::Outbound,
                        LogStatus::Error,
                        "local post missing",
                        Some(json!({"post_id": mapping.local_id})),
                    )
                    .await?;
                continue;
            };

            let payload = outbound_payload(&local, config);
            let remote_id = match mapping.remote_id.as_str() {
                "" => None,
                id => Some(id),
            };

            let result = provider.sync_outbound(&payload, remote_id).await;
            if result.success {
                self.mappings
                    .mark_synced(mapping.id, result.remote_id.as_deref(), Utc::now())
                    .await?;
                self.logs
                    .append(
                        integration.id,
                        Some(mapping.id),
                        sync_run_id,
                        SyncDirection::Outbound,
                        LogStatus::Success,
                        "pushed local post to remote",
                        Some(json!({
                            "post_id": local.id,
                            "remote_id": result.remote_id.or_else(|| remote_id.map(str::to_string)),
                        })),
                    )
                    .await?;
            } else {
                let error = result
                    .error
                    .unwrap_or_else(|| "outbound push failed".to_string());
                self.mappings.mark_error(mapping.id, &error).await?;
                self.logs
                    .append(
                        integration.id,
                        Some(mapping.id),
                        sync_run_id,
                        SyncDirection::Outbound,
                        LogStatus::Error,
                        "outbound push failed",
                        Some(json!({"post_id": local.id, "error": error})),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

/// Builds the outbound payload for a post, mapping its local status onto the
/// remote option through the inverted status mapping.
pub fn outbound_payload(local: &post::Model, config: &IntegrationConfig) -> PostPayload {
    PostPayload {
        title: local.title.clone(),
        description: local.details.clone(),
        tags: local.tag_list(),
        remote_status_id: local
            .status_id
            .and_then(|sid| config.remote_status(&sid.to_string()))
            .map(str::to_string),
    }
}

fn differing_fields(
    local: &post::Model,
    change: &RemoteChange,
    mapped_status_id: Option<Uuid>,
) -> Vec<String> {
    let mut fields = Vec::new();
    if local.title != change.title {
        fields.push("title".to_string());
    }
    if local.details != change.description {
        fields.push("description".to_string());
    }
    if local.tag_list() != change.tags {
        fields.push("tags".to_string());
    }
    if change.remote_status_id.is_some() && local.status_id != mapped_status_id {
        fields.push("status".to_string());
    }
    if fields.is_empty() {
        // Timestamps diverged without visible field changes; name the
        // heuristic so the conflict row is still actionable.
        fields.push("updated_at".to_string());
    }
    fields
}
