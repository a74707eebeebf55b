//! End-to-end orchestrator tests with a scripted provider and in-memory
//! SQLite.

mod test_utils;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use integrations::models::integration_mapping::{
    self, LOCAL_TYPE_POST, MappingStatus,
};
use integrations::models::post;
use integrations::providers::IntegrationConfig;
use integrations::repositories::{IntegrationRepository, MappingRepository, PostRepository};
use integrations::sync::{SyncOrchestrator, SyncRunError};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use test_utils::{
    FakeProvider, create_board, create_integration, create_post, create_tenant, remote_change,
    setup_test_db_arc,
};
use uuid::Uuid;

const SKEW_SECONDS: u64 = 2;

fn orchestrator(db: Arc<DatabaseConnection>) -> SyncOrchestrator {
    SyncOrchestrator::new(db, SKEW_SECONDS)
}

async fn backdate_mapping(db: &DatabaseConnection, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    integration_mapping::ActiveModel {
        id: Set(id),
        last_synced_at: Set(Some(at.into())),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

async fn touch_post(db: &DatabaseConnection, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    post::ActiveModel {
        id: Set(id),
        updated_at: Set(at.into()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

#[tokio::test]
async fn failed_connectivity_gate_aborts_without_mutation() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "bidirectional").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let provider = FakeProvider::disconnected("invalid token");
    let err = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncRunError::Connection(_)));

    assert!(post::Entity::find().all(db.as_ref()).await?.is_empty());
    assert!(
        integration_mapping::Entity::find()
            .all(db.as_ref())
            .await?
            .is_empty()
    );
    let row = IntegrationRepository::new(db.clone())
        .find_by_id(integration.id)
        .await?
        .unwrap();
    assert!(row.last_sync_at.is_none());

    Ok(())
}

#[tokio::test]
async fn inbound_new_item_creates_post_and_mapping() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let provider = FakeProvider::with_inbound(vec![remote_change("page-1", "Dark mode")]);
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.items, 1);
    assert_eq!(outcome.summary.successes, 1);
    assert_eq!(outcome.summary.direction, "inbound");

    let posts = post::Entity::find().all(db.as_ref()).await?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Dark mode");
    assert_eq!(posts[0].board_id, board_id);
    assert_eq!(posts[0].tag_list(), vec!["feedback".to_string()]);

    let mapping = MappingRepository::new(db.clone())
        .find_by_remote(integration.id, "page-1")
        .await?
        .unwrap();
    assert_eq!(mapping.local_id, posts[0].id);
    assert_eq!(mapping.status, "synced");
    assert_eq!(mapping.origin_direction(), "inbound");

    let row = IntegrationRepository::new(db.clone())
        .find_by_id(integration.id)
        .await?
        .unwrap();
    assert!(row.last_sync_at.is_some());

    Ok(())
}

#[tokio::test]
async fn locally_edited_post_becomes_conflict_instead_of_overwrite() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Local title").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-1",
            "outbound",
            MappingStatus::Synced,
        )
        .await?;

    // Mapping synced a minute ago, post edited since: past the skew window.
    backdate_mapping(&db, mapping.id, Utc::now() - Duration::seconds(60)).await?;
    touch_post(&db, local.id, Utc::now()).await?;

    let provider = FakeProvider::with_inbound(vec![remote_change("page-1", "Remote title")]);
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.conflicts, 1);
    assert_eq!(outcome.summary.successes, 0);

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "conflict");
    let detail = mapping.last_error.unwrap();
    assert!(detail.contains("title"), "detail was: {detail}");

    // The local post is untouched until the conflict is resolved.
    let untouched = PostRepository::new(db.clone())
        .find_by_id(local.id)
        .await?
        .unwrap();
    assert_eq!(untouched.title, "Local title");

    Ok(())
}

#[tokio::test]
async fn unmodified_post_gets_remote_changes_applied() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "inbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Old title").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-1",
            "outbound",
            MappingStatus::Synced,
        )
        .await?;
    // Post edited before the last sync: within the unmodified window.
    backdate_mapping(&db, mapping.id, Utc::now()).await?;
    touch_post(&db, local.id, Utc::now() - Duration::seconds(60)).await?;

    let provider = FakeProvider::with_inbound(vec![remote_change("page-1", "New title")]);
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.successes, 1);
    assert_eq!(outcome.summary.conflicts, 0);

    let updated = PostRepository::new(db.clone())
        .find_by_id(local.id)
        .await?
        .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.details.as_deref(), Some("from remote"));

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "synced");

    Ok(())
}

#[tokio::test]
async fn outbound_failure_marks_mapping_errored() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "outbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Push me").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-1",
            "outbound",
            MappingStatus::Pending,
        )
        .await?;

    let provider = FakeProvider {
        fail_outbound_for: vec!["page-1".to_string()],
        ..FakeProvider::default()
    };
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.errors, 1);
    assert_eq!(outcome.summary.direction, "outbound");

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "error");
    assert!(mapping.last_error.unwrap().contains("page-1"));

    Ok(())
}

#[tokio::test]
async fn conflicted_mappings_are_skipped_outbound() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "outbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Contested").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-1",
            "outbound",
            MappingStatus::Synced,
        )
        .await?;
    mappings.mark_conflict(mapping.id, "diverged").await?;

    let provider = FakeProvider::default();
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.skipped, 1);
    assert_eq!(provider.outbound_call_count(), 0);

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "conflict");

    Ok(())
}

#[tokio::test]
async fn outbound_create_assigns_remote_id() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "outbound").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Brand new").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "",
            "outbound",
            MappingStatus::Pending,
        )
        .await?;

    let provider = FakeProvider::default();
    orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    let calls = provider.outbound_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.title, "Brand new");
    // Empty remote_id means create, not update.
    assert!(calls[0].1.is_none());
    drop(calls);

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "synced");
    assert_eq!(mapping.remote_id, "created-0");

    Ok(())
}

#[tokio::test]
async fn bidirectional_run_has_phase_marker_and_both_directions() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "bidirectional").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Outbound only").await?;
    MappingRepository::new(db.clone())
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-out",
            "outbound",
            MappingStatus::Pending,
        )
        .await?;

    let provider = FakeProvider::with_inbound(vec![remote_change("page-in", "Inbound item")]);
    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.direction, "bidirectional");
    // Inbound create, then outbound pushes for both mappings.
    assert_eq!(outcome.summary.successes, 3);
    assert_eq!(outcome.summary.errors, 0);

    let logs = integrations::repositories::SyncLogRepository::new(db.clone());
    let rows = logs.list_run(outcome.sync_run_id).await?;
    assert_eq!(rows.iter().filter(|row| row.is_phase_marker()).count(), 1);
    assert!(rows.iter().any(|row| row.direction == "inbound"));
    assert!(
        rows.iter()
            .any(|row| row.direction == "outbound" && !row.is_phase_marker())
    );

    Ok(())
}

#[tokio::test]
async fn bidirectional_run_isolates_outbound_failure() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "bidirectional").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Broken push").await?;
    let mappings = MappingRepository::new(db.clone());
    let failing = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-out",
            "outbound",
            MappingStatus::Pending,
        )
        .await?;

    let provider = FakeProvider {
        inbound: std::sync::Mutex::new(Ok(vec![remote_change("page-in", "Inbound item")])),
        fail_outbound_for: vec!["page-out".to_string()],
        ..FakeProvider::default()
    };

    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    // Inbound create plus the push of its new mapping succeed; page-out fails.
    assert_eq!(outcome.summary.successes, 2);
    assert_eq!(outcome.summary.errors, 1);
    assert_eq!(outcome.summary.direction, "bidirectional");

    let logs = integrations::repositories::SyncLogRepository::new(db.clone());
    let rows = logs.list_run(outcome.sync_run_id).await?;
    assert_eq!(rows.iter().filter(|row| row.is_phase_marker()).count(), 1);
    assert!(
        rows.iter()
            .any(|row| row.direction == "outbound" && row.status == "error")
    );

    let failing = mappings.find_by_id(failing.id).await?.unwrap();
    assert_eq!(failing.status, "error");

    Ok(())
}

#[tokio::test]
async fn failed_inbound_pull_logs_error_but_outbound_still_runs() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let integration = create_integration(&db, tenant_id, board_id, "tok", "bidirectional").await?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let local = create_post(&db, tenant_id, board_id, "Still pushed").await?;
    let mappings = MappingRepository::new(db.clone());
    let mapping = mappings
        .create(
            integration.id,
            LOCAL_TYPE_POST,
            local.id,
            "page-1",
            "outbound",
            MappingStatus::Pending,
        )
        .await?;

    let provider = FakeProvider::default();
    *provider.inbound.lock().unwrap() = Err("rate limited".to_string());

    let outcome = orchestrator(db.clone())
        .run(&integration, &config, &provider)
        .await?;

    assert_eq!(outcome.summary.errors, 1);
    assert_eq!(outcome.summary.successes, 1);
    assert_eq!(provider.outbound_call_count(), 1);

    let mapping = mappings.find_by_id(mapping.id).await?.unwrap();
    assert_eq!(mapping.status, "synced");

    let row = IntegrationRepository::new(db.clone())
        .find_by_id(integration.id)
        .await?
        .unwrap();
    assert!(row.last_sync_at.is_some());

    Ok(())
}
