//! IntegrationMapping entity model
//!
//! The correspondence unit between one local entity and one remote item
//! within one integration. At most one mapping may exist per
//! (integration_id, local_type, local_id); the migration enforces this with
//! a unique index so racing runs fail loudly instead of double-linking.

use super::integration::Entity as Integration;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// The only local entity type currently synchronized.
pub const LOCAL_TYPE_POST: &str = "post";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integration_mappings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub integration_id: Uuid,

    /// Local entity kind, currently always "post"
    pub local_type: String,

    pub local_id: Uuid,

    /// Remote item identifier, scoped to the integration
    pub remote_id: String,

    /// See [`MappingStatus`]
    pub status: String,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub last_error: Option<String>,

    /// Carries at minimum `direction: "inbound"|"outbound"` recording how
    /// the link originated
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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

/// Mapping lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    Synced,
    Pending,
    Conflict,
    Error,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingStatus::Synced => "synced",
            MappingStatus::Pending => "pending",
            MappingStatus::Conflict => "conflict",
            MappingStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "synced" => Some(MappingStatus::Synced),
            "pending" => Some(MappingStatus::Pending),
            "conflict" => Some(MappingStatus::Conflict),
            "error" => Some(MappingStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Model {
    /// Which side created the link, read from metadata. Defaults to outbound
    /// when the metadata is absent or malformed.
    pub fn origin_direction(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("direction"))
            .and_then(|direction| direction.as_str())
            .unwrap_or("outbound")
    }
}
