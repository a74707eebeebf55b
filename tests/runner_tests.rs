//! End-to-end cron runner tests: encrypted credentials, a mocked Notion API,
//! and in-memory SQLite.

mod test_utils;

use anyhow::Result;
use chrono::{Duration, Utc};
use integrations::config::AppConfig;
use integrations::crypto::SecretCipher;
use integrations::models::{integration, integration_mapping, post};
use integrations::sync::SyncRunner;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use std::sync::Arc;
use test_utils::{create_board, create_integration, create_tenant, setup_test_db_arc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "unit-test-passphrase";

fn test_config(mock_uri: &str) -> Arc<AppConfig> {
    let mut config = AppConfig::default();
    config.encryption_secret = Some(SECRET.to_string());
    config.sync_enabled = true;
    config.notion_api_base = Some(mock_uri.to_string());
    Arc::new(config)
}

fn encrypted_token() -> Result<String> {
    let cipher = SecretCipher::new(Some(SECRET.to_string()));
    Ok(cipher.encrypt("ntn_test_token")?)
}

fn notion_page(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "properties": {
            "Name": {"title": [{"plain_text": title}]},
            "Description": {"rich_text": [{"plain_text": "from notion"}]},
            "Tags": {"multi_select": [{"name": "ui"}]},
            "Status": {"status": {"id": "opt-1"}}
        }
    })
}

async fn mock_healthy_gate(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "user"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn due_integration_syncs_end_to_end() -> Result<()> {
    let server = MockServer::start().await;
    mock_healthy_gate(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [notion_page("page-1", "Dark mode")],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(&server)
        .await;

    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    create_integration(&db, tenant_id, board_id, &encrypted_token()?, "inbound").await?;

    let runner = SyncRunner::new(db.clone(), test_config(&server.uri()))?;
    let report = runner.run_once().await?;

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 0);
    assert!(report.errors.is_empty());

    let posts = post::Entity::find().all(db.as_ref()).await?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Dark mode");
    assert_eq!(posts[0].details.as_deref(), Some("from notion"));

    let mappings = integration_mapping::Entity::find().all(db.as_ref()).await?;
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].remote_id, "page-1");
    assert_eq!(mappings[0].status, "synced");

    Ok(())
}

#[tokio::test]
async fn disabled_sync_feature_skips_the_batch() -> Result<()> {
    let server = MockServer::start().await;
    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    create_integration(&db, tenant_id, board_id, &encrypted_token()?, "inbound").await?;

    let mut config = AppConfig::default();
    config.encryption_secret = Some(SECRET.to_string());
    config.sync_enabled = false;
    config.notion_api_base = Some(server.uri());

    let runner = SyncRunner::new(db.clone(), Arc::new(config))?;
    let report = runner.run_once().await?;

    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 0);
    assert!(report.errors.is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_gate_is_a_batch_error_with_no_writes() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "API token is invalid"})),
        )
        .mount(&server)
        .await;

    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let row = create_integration(&db, tenant_id, board_id, &encrypted_token()?, "inbound").await?;

    let runner = SyncRunner::new(db.clone(), test_config(&server.uri()))?;
    let report = runner.run_once().await?;

    assert_eq!(report.processed, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].integration_id, row.id);

    assert!(post::Entity::find().all(db.as_ref()).await?.is_empty());
    assert!(
        integration_mapping::Entity::find()
            .all(db.as_ref())
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
async fn recently_synced_integration_is_counted_skipped() -> Result<()> {
    let server = MockServer::start().await;
    mock_healthy_gate(&server).await;

    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    let row = create_integration(&db, tenant_id, board_id, &encrypted_token()?, "inbound").await?;
    mark_synced_recently(&db, row.id).await?;

    let runner = SyncRunner::new(db.clone(), test_config(&server.uri()))?;
    let report = runner.run_once().await?;

    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 1);
    assert!(report.errors.is_empty());

    Ok(())
}

async fn mark_synced_recently(db: &DatabaseConnection, id: uuid::Uuid) -> Result<()> {
    integration::ActiveModel {
        id: Set(id),
        last_sync_at: Set(Some((Utc::now() - Duration::minutes(1)).into())),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

#[tokio::test]
async fn undecryptable_credential_is_a_batch_error() -> Result<()> {
    let server = MockServer::start().await;
    mock_healthy_gate(&server).await;

    let db = setup_test_db_arc().await?;
    let tenant_id = create_tenant(&db).await?;
    let board_id = create_board(&db, tenant_id).await?;
    // Encrypted under a different passphrase than the runner's.
    let wrong_cipher = SecretCipher::new(Some("another-passphrase".to_string()));
    let token = wrong_cipher.encrypt("ntn_test_token")?;
    let row = create_integration(&db, tenant_id, board_id, &token, "inbound").await?;

    let runner = SyncRunner::new(db.clone(), test_config(&server.uri()))?;
    let report = runner.run_once().await?;

    assert_eq!(report.processed, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].integration_id, row.id);

    Ok(())
}
