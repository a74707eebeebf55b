//! Integration repository
//!
//! SeaORM operations for the integrations table, including the due-for-sync
//! scan used by the cron runner.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::integration::{self, Entity as Integration};

#[derive(Debug, Clone)]
pub struct IntegrationRepository {
    pub db: Arc<DatabaseConnection>,
}

impl IntegrationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<integration::Model>> {
        Ok(Integration::find_by_id(id).one(self.db.as_ref()).await?)
    }

    pub async fn create(&self, model: integration::ActiveModel) -> Result<integration::Model> {
        Ok(model.insert(self.db.as_ref()).await?)
    }

    /// Every integration eligible for scheduling: enabled with an interval
    /// configured. Due-ness is evaluated in [`is_due`].
    pub async fn find_enabled_scheduled(&self) -> Result<Vec<integration::Model>> {
        Ok(Integration::find()
            .filter(integration::Column::Enabled.eq(true))
            .filter(integration::Column::SyncIntervalMinutes.is_not_null())
            .all(self.db.as_ref())
            .await?)
    }

    /// Integrations due for a scheduled run at `now`. Never-synced rows sort
    /// first, then oldest sync first.
    pub async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<integration::Model>> {
        let mut due: Vec<integration::Model> = self
            .find_enabled_scheduled()
            .await?
            .into_iter()
            .filter(|row| is_due(row, now))
            .collect();

        due.sort_by_key(|row| row.last_sync_at.map(|last| last.with_timezone(&Utc)));

        Ok(due)
    }

    /// Stamps a completed run, regardless of per-item outcomes.
    pub async fn touch_last_sync(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let model = integration::ActiveModel {
            id: Set(id),
            last_sync_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        Integration::delete_by_id(id).exec(self.db.as_ref()).await?;
        Ok(())
    }
}

/// Whether a scheduled integration's interval has elapsed at `now`. Rows
/// that have never synced are always due.
pub fn is_due(row: &integration::Model, now: DateTime<Utc>) -> bool {
    let Some(interval) = row.sync_interval_minutes else {
        return false;
    };
    match row.last_sync_at {
        None => true,
        Some(last) => last.with_timezone(&Utc) + Duration::minutes(i64::from(interval)) <= now,
    }
}
