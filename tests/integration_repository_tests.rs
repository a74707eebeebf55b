//! Integration repository tests, focused on the due-for-sync scan.

mod test_utils;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use integrations::models::integration;
use integrations::repositories::IntegrationRepository;
use sea_orm::{ActiveModelTrait, Set};
use test_utils::{create_board, create_integration, create_tenant, setup_test_db_arc};

async fn set_schedule(
    db: &sea_orm::DatabaseConnection,
    id: uuid::Uuid,
    enabled: bool,
    interval_minutes: Option<i32>,
    last_sync_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let model = integration::ActiveModel {
        id: Set(id),
        enabled: Set(enabled),
        sync_interval_minutes: Set(interval_minutes),
        last_sync_at: Set(last_sync_at.map(Into::into)),
        ..Default::default()
    };
    model.update(db).await?;
    Ok(())
}

#[tokio::test]
async fn due_scan_applies_schedule_rules() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = IntegrationRepository::new(db.clone());

    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;

    let never_synced = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let overdue = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let fresh = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let disabled = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let manual_only = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;

    let now = Utc::now();
    set_schedule(&db, never_synced.id, true, Some(15), None).await?;
    set_schedule(&db, overdue.id, true, Some(15), Some(now - Duration::minutes(30))).await?;
    set_schedule(&db, fresh.id, true, Some(15), Some(now - Duration::minutes(1))).await?;
    set_schedule(&db, disabled.id, false, Some(15), Some(now - Duration::minutes(120))).await?;
    set_schedule(&db, manual_only.id, true, None, Some(now - Duration::minutes(120))).await?;

    let due = repo.find_due(now).await?;
    let due_ids: Vec<_> = due.iter().map(|row| row.id).collect();

    assert_eq!(due_ids.len(), 2);
    // Never-synced rows come first, then oldest sync first.
    assert_eq!(due_ids[0], never_synced.id);
    assert_eq!(due_ids[1], overdue.id);

    Ok(())
}

#[tokio::test]
async fn interval_boundary_is_inclusive() -> Result<()> {
    let db = setup_test_db_arc().await?;

    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let row = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;

    let now = Utc::now();
    set_schedule(&db, row.id, true, Some(10), Some(now - Duration::minutes(10))).await?;
    let repo = IntegrationRepository::new(db.clone());
    let row = repo.find_by_id(row.id).await?.unwrap();

    assert!(integrations::repositories::integration::is_due(&row, now));
    assert!(!integrations::repositories::integration::is_due(
        &row,
        now - Duration::minutes(5)
    ));

    Ok(())
}

#[tokio::test]
async fn touch_last_sync_stamps_the_row() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = IntegrationRepository::new(db.clone());

    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let row = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    assert!(row.last_sync_at.is_none());

    let now = Utc::now();
    repo.touch_last_sync(row.id, now).await?;

    let updated = repo.find_by_id(row.id).await?.unwrap();
    let stamped = updated.last_sync_at.unwrap().with_timezone(&Utc);
    assert!((stamped - now).num_seconds().abs() < 2);

    Ok(())
}
