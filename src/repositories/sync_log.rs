//! Sync log repository
//!
//! Append-only writes to integration_sync_logs plus run-level summaries.
//! Phase-marker rows are bookkeeping, not items: excluded from item counts,
//! but they do participate in a run's aggregate direction.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::integration_sync_log::{
    self, Entity as IntegrationSyncLog, LogStatus, PHASE_MARKER, SyncDirection,
};

#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pub db: Arc<DatabaseConnection>,
}

/// Item-level tallies for one sync run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub items: u64,
    pub successes: u64,
    pub errors: u64,
    pub conflicts: u64,
    pub skipped: u64,
    /// "inbound", "outbound", or "bidirectional" when the run logged both.
    pub direction: String,
}

impl SyncLogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn append(
        &self,
        integration_id: Uuid,
        mapping_id: Option<Uuid>,
        sync_run_id: Uuid,
        direction: SyncDirection,
        status: LogStatus,
        message: &str,
        details: Option<JsonValue>,
    ) -> Result<integration_sync_log::Model> {
        let model = integration_sync_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            integration_id: Set(integration_id),
            mapping_id: Set(mapping_id),
            sync_run_id: Set(sync_run_id),
            direction: Set(direction.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            message: Set(message.to_string()),
            details: Set(details),
            created_at: Set(Utc::now().into()),
        };
        Ok(model.insert(self.db.as_ref()).await?)
    }

    /// Records the inbound-to-outbound boundary of a bidirectional run. The
    /// marker carries the direction of the phase it opens.
    pub async fn append_phase_marker(
        &self,
        integration_id: Uuid,
        sync_run_id: Uuid,
    ) -> Result<integration_sync_log::Model> {
        self.append(
            integration_id,
            None,
            sync_run_id,
            SyncDirection::Outbound,
            LogStatus::Skipped,
            PHASE_MARKER,
            None,
        )
        .await
    }

    pub async fn list_run(&self, sync_run_id: Uuid) -> Result<Vec<integration_sync_log::Model>> {
        Ok(IntegrationSyncLog::find()
            .filter(integration_sync_log::Column::SyncRunId.eq(sync_run_id))
            .order_by_asc(integration_sync_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn run_summary(&self, sync_run_id: Uuid) -> Result<RunSummary> {
        let rows = self.list_run(sync_run_id).await?;

        let mut summary = RunSummary {
            items: 0,
            successes: 0,
            errors: 0,
            conflicts: 0,
            skipped: 0,
            direction: String::new(),
        };

        let mut saw_inbound = false;
        let mut saw_outbound = false;

        for row in &rows {
            match row.direction.as_str() {
                "inbound" => saw_inbound = true,
                "outbound" => saw_outbound = true,
                _ => {}
            }

            if row.is_phase_marker() {
                continue;
            }

            summary.items += 1;
            match row.status.as_str() {
                "success" => summary.successes += 1,
                "error" => summary.errors += 1,
                "conflict" => summary.conflicts += 1,
                "skipped" => summary.skipped += 1,
                _ => {}
            }
        }

        summary.direction = match (saw_inbound, saw_outbound) {
            (true, true) => "bidirectional".to_string(),
            (true, false) => "inbound".to_string(),
            (false, true) => "outbound".to_string(),
            (false, false) => String::new(),
        };

        Ok(summary)
    }
}
