//! Mapping store
//!
//! SeaORM operations for integration_mappings, the correspondence table
//! between local posts and remote items. The unique index on
//! (integration_id, local_type, local_id) is the safety net against
//! duplicate links; `create` deliberately lets that violation surface.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::integration_mapping::{self, Entity as IntegrationMapping, MappingStatus};

#[derive(Debug, Clone)]
pub struct MappingRepository {
    pub db: Arc<DatabaseConnection>,
}

impl MappingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<integration_mapping::Model>> {
        Ok(IntegrationMapping::find_by_id(id)
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn find_by_local(
        &self,
        integration_id: Uuid,
        local_type: &str,
        local_id: Uuid,
    ) -> Result<Option<integration_mapping::Model>> {
        Ok(IntegrationMapping::find()
            .filter(integration_mapping::Column::IntegrationId.eq(integration_id))
            .filter(integration_mapping::Column::LocalType.eq(local_type))
            .filter(integration_mapping::Column::LocalId.eq(local_id))
            .one(self.db.as_ref())
            .await?)
    }

    /// Remote IDs are only unique per integration, so lookups are scoped.
    pub async fn find_by_remote(
        &self,
        integration_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<integration_mapping::Model>> {
        Ok(IntegrationMapping::find()
            .filter(integration_mapping::Column::IntegrationId.eq(integration_id))
            .filter(integration_mapping::Column::RemoteId.eq(remote_id))
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn list_for_integration(
        &self,
        integration_id: Uuid,
    ) -> Result<Vec<integration_mapping::Model>> {
        Ok(IntegrationMapping::find()
            .filter(integration_mapping::Column::IntegrationId.eq(integration_id))
            .order_by_asc(integration_mapping::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn list_conflicts(
        &self,
        integration_id: Uuid,
    ) -> Result<Vec<integration_mapping::Model>> {
        Ok(IntegrationMapping::find()
            .filter(integration_mapping::Column::IntegrationId.eq(integration_id))
            .filter(integration_mapping::Column::Status.eq(MappingStatus::Conflict.as_str()))
            .order_by_asc(integration_mapping::Column::UpdatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Local post IDs whose link originated from an inbound pull. Used when
    /// an integration is deleted to clean up posts it created.
    pub async fn list_inbound_local_ids(&self, integration_id: Uuid) -> Result<Vec<Uuid>> {
        let mappings = self.list_for_integration(integration_id).await?;
        Ok(mappings
            .into_iter()
            .filter(|mapping| mapping.origin_direction() == "inbound")
            .map(|mapping| mapping.local_id)
            .collect())
    }

    /// Inserts a new link. A duplicate (integration, local_type, local_id)
    /// key propagates the database unique violation to the caller.
    pub async fn create(
        &self,
        integration_id: Uuid,
        local_type: &str,
        local_id: Uuid,
        remote_id: &str,
        direction: &str,
        status: MappingStatus,
    ) -> Result<integration_mapping::Model> {
        let now = Utc::now();
        let model = integration_mapping::ActiveModel {
            id: Set(Uuid::new_v4()),
            integration_id: Set(integration_id),
            local_type: Set(local_type.to_string()),
            local_id: Set(local_id),
            remote_id: Set(remote_id.to_string()),
            status: Set(status.as_str().to_string()),
            last_synced_at: Set(match status {
                MappingStatus::Synced => Some(now.into()),
                _ => None,
            }),
            last_error: Set(None),
            metadata: Set(Some(json!({"direction": direction}))),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(model.insert(self.db.as_ref()).await?)
    }

    /// Marks a successful sync, refreshing the remote ID when the item was
    /// just created on the remote side.
    pub async fn mark_synced(
        &self,
        id: Uuid,
        remote_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut model = integration_mapping::ActiveModel {
            id: Set(id),
            status: Set(MappingStatus::Synced.as_str().to_string()),
            last_synced_at: Set(Some(now.into())),
            last_error: Set(None),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        if let Some(remote_id) = remote_id {
            model.remote_id = Set(remote_id.to_string());
        }
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn mark_error(&self, id: Uuid, error: &str) -> Result<()> {
        let model = integration_mapping::ActiveModel {
            id: Set(id),
            status: Set(MappingStatus::Error.as_str().to_string()),
            last_error: Set(Some(error.to_string())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn mark_conflict(&self, id: Uuid, detail: &str) -> Result<()> {
        let model = integration_mapping::ActiveModel {
            id: Set(id),
            status: Set(MappingStatus::Conflict.as_str().to_string()),
            last_error: Set(Some(detail.to_string())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn delete_for_integration(&self, integration_id: Uuid) -> Result<u64> {
        let result = IntegrationMapping::delete_many()
            .filter(integration_mapping::Column::IntegrationId.eq(integration_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes every link to a local entity across all integrations, used
    /// when the entity itself is deleted.
    pub async fn delete_for_local(&self, local_type: &str, local_id: Uuid) -> Result<u64> {
        let result = IntegrationMapping::delete_many()
            .filter(integration_mapping::Column::LocalType.eq(local_type))
            .filter(integration_mapping::Column::LocalId.eq(local_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
