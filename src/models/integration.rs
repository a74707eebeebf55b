//! Integration entity model
//!
//! One row per external connection per tenant. The `config` column holds the
//! versioned [`IntegrationConfig`](crate::providers::config::IntegrationConfig)
//! blob whose `api_key` field is a credential-cipher token.

use super::tenant::Entity as Tenant;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Provider discriminant, see [`ProviderType`]
    pub provider: String,

    /// Human-readable name chosen by the admin
    pub name: String,

    /// Versioned config blob; the api_key inside is encrypted at rest
    #[sea_orm(column_type = "JsonBinary")]
    pub config: JsonValue,

    pub enabled: bool,

    /// Minutes between scheduled runs; null means manual-only
    pub sync_interval_minutes: Option<i32>,

    /// Set after every completed run, failed items included
    pub last_sync_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Tenant",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<Tenant> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed set of supported providers. Adding one means adding a variant and a
/// factory arm, not touching callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Notion,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Notion => "notion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "notion" => Some(ProviderType::Notion),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Model {
    pub fn provider_type(&self) -> Option<ProviderType> {
        ProviderType::parse(&self.provider)
    }
}
