//! IntegrationSyncLog entity model
//!
//! Append-only log rows, one per synchronized item or per phase marker,
//! grouped by `sync_run_id`. Rows with `message == PHASE_MARKER` record the
//! inbound-to-outbound transition inside a bidirectional run; they are not
//! items and must be excluded from item counts.

use super::integration::Entity as Integration;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Distinguished message marking a direction transition within a run.
pub const PHASE_MARKER: &str = "phase_marker";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integration_sync_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub integration_id: Uuid,

    pub mapping_id: Option<Uuid>,

    /// Groups every row written by one orchestrator invocation
    pub sync_run_id: Uuid,

    /// See [`SyncDirection`]
    pub direction: String,

    /// See [`LogStatus`]
    pub status: String,

    pub message: String,

    /// Structured detail, may include a `post_id`
    #[sea_orm(column_type = "JsonBinary")]
    pub details: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Integration",
        from = "Column::IntegrationId",
        to = "super::integration::Column::Id"
    )]
    Integration,
}

impl Related<Integration> for Entity {
    fn to() -> RelationDef {
        Relation::Integration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_phase_marker(&self) -> bool {
        self.message == PHASE_MARKER
    }
}

/// Direction of one sync phase, and of each log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Inbound,
    Outbound,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Inbound => "inbound",
            SyncDirection::Outbound => "outbound",
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one logged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
    Conflict,
    Skipped,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
            LogStatus::Conflict => "conflict",
            LogStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
