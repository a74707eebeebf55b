//! Post repository
//!
//! The slice of post persistence the sync engine needs: lookups, creation
//! from inbound remote items, and applying remote field changes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::post::{self, Entity as Post};
use crate::providers::trait_::RemoteChange;

#[derive(Debug, Clone)]
pub struct PostRepository {
    pub db: Arc<DatabaseConnection>,
}

impl PostRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<post::Model>> {
        Ok(Post::find_by_id(id).one(self.db.as_ref()).await?)
    }

    /// Creates a local post from an inbound remote item.
    pub async fn create_from_remote(
        &self,
        tenant_id: Uuid,
        board_id: Uuid,
        change: &RemoteChange,
        status_id: Option<Uuid>,
    ) -> Result<post::Model> {
        let now = Utc::now();
        let model = post::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            board_id: Set(board_id),
            status_id: Set(status_id),
            title: Set(change.title.clone()),
            details: Set(change.description.clone()),
            tags: Set(Some(json!(change.tags))),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(model.insert(self.db.as_ref()).await?)
    }

    /// Removes posts by ID. Used when an integration is torn down and the
    /// posts it pulled in should go with it.
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let outcome = Post::delete_many()
            .filter(post::Column::Id.is_in(ids.iter().copied()))
            .exec(self.db.as_ref())
            .await?;
        Ok(outcome.rows_affected)
    }

    /// Overwrites local fields with the remote state.
    pub async fn apply_remote(
        &self,
        post_id: Uuid,
        change: &RemoteChange,
        status_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<post::Model> {
        let model = post::ActiveModel {
            id: Set(post_id),
            title: Set(change.title.clone()),
            details: Set(change.description.clone()),
            tags: Set(Some(json!(change.tags))),
            status_id: Set(status_id),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        Ok(model.update(self.db.as_ref()).await?)
    }
}
