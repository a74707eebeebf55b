//! Test utilities: in-memory SQLite setup, fixture builders, and a scripted
//! fake remote provider.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use integrations::models::{board, integration, post, post_status, tenant};
use migration::{Migrator, MigratorTrait};
use integrations::providers::trait_::{
    ConnectionCheck, OutboundResult, PostPayload, ProviderError, RemoteChange, RemoteDatabase,
    RemoteProvider, RemoteSchema,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set, Statement};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // SQLite enforces FK order more eagerly than Postgres; relax it so
    // fixtures can be inserted piecemeal.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

#[allow(dead_code)]
pub async fn create_tenant(db: &DatabaseConnection) -> Result<Uuid> {
    let id = Uuid::new_v4();
    tenant::ActiveModel {
        id: Set(id),
        name: Set("Acme".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(id)
}

#[allow(dead_code)]
pub async fn create_board(db: &DatabaseConnection, tenant_id: Uuid) -> Result<Uuid> {
    let id = Uuid::new_v4();
    board::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        name: Set("Feature Requests".to_string()),
        slug: Set("feature-requests".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(id)
}

#[allow(dead_code)]
pub async fn create_status(db: &DatabaseConnection, tenant_id: Uuid, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    post_status::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        name: Set(name.to_string()),
        sort_order: Set(0),
    }
    .insert(db)
    .await?;
    Ok(id)
}

#[allow(dead_code)]
pub async fn create_post(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    board_id: Uuid,
    title: &str,
) -> Result<post::Model> {
    let now = Utc::now();
    Ok(post::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        board_id: Set(board_id),
        status_id: Set(None),
        title: Set(title.to_string()),
        details: Set(None),
        tags: Set(Some(json!([]))),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?)
}

/// Inserts an integration row with a standard config blob. `api_key` goes
/// into the blob verbatim, so pass a cipher token when the test decrypts.
#[allow(dead_code)]
pub async fn create_integration(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    board_id: Uuid,
    api_key: &str,
    direction: &str,
) -> Result<integration::Model> {
    let now = Utc::now();
    Ok(integration::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        provider: Set("notion".to_string()),
        name: Set("Notion roadmap".to_string()),
        config: Set(json!({
            "version": 1,
            "api_key": api_key,
            "database_id": "db-1",
            "board_id": board_id,
            "direction": direction,
        })),
        enabled: Set(true),
        sync_interval_minutes: Set(Some(15)),
        last_sync_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?)
}

#[allow(dead_code)]
pub fn remote_change(remote_id: &str, title: &str) -> RemoteChange {
    RemoteChange {
        remote_id: remote_id.to_string(),
        title: title.to_string(),
        description: Some("from remote".to_string()),
        tags: vec!["feedback".to_string()],
        remote_status_id: None,
    }
}

/// Scripted in-memory provider for orchestrator and resolver tests.
#[allow(dead_code)]
pub struct FakeProvider {
    pub connection_error: Option<String>,
    pub inbound: Mutex<Result<Vec<RemoteChange>, String>>,
    /// Remote IDs whose outbound update should fail.
    pub fail_outbound_for: Vec<String>,
    pub fail_creates: bool,
    pub created: AtomicUsize,
    pub outbound_calls: Mutex<Vec<(PostPayload, Option<String>)>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            connection_error: None,
            inbound: Mutex::new(Ok(Vec::new())),
            fail_outbound_for: Vec::new(),
            fail_creates: false,
            created: AtomicUsize::new(0),
            outbound_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProvider {
    #[allow(dead_code)]
    pub fn with_inbound(changes: Vec<RemoteChange>) -> Self {
        Self {
            inbound: Mutex::new(Ok(changes)),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn disconnected(error: &str) -> Self {
        Self {
            connection_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn outbound_call_count(&self) -> usize {
        self.outbound_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteProvider for FakeProvider {
    async fn test_connection(&self) -> ConnectionCheck {
        match &self.connection_error {
            None => ConnectionCheck::ok(),
            Some(error) => ConnectionCheck::failed(error.clone()),
        }
    }

    async fn list_remote_databases(&self) -> Result<Vec<RemoteDatabase>, ProviderError> {
        Ok(vec![RemoteDatabase {
            id: "db-1".to_string(),
            name: "Roadmap".to_string(),
        }])
    }

    async fn database_schema(&self, _database_id: &str) -> Result<RemoteSchema, ProviderError> {
        Ok(RemoteSchema {
            properties: Vec::new(),
            status_options: Vec::new(),
        })
    }

    async fn sync_inbound(&self) -> Result<Vec<RemoteChange>, ProviderError> {
        match &*self.inbound.lock().unwrap() {
            Ok(changes) => Ok(changes.clone()),
            Err(message) => Err(ProviderError::Network(message.clone())),
        }
    }

    async fn sync_outbound(&self, post: &PostPayload, remote_id: Option<&str>) -> OutboundResult {
        self.outbound_calls
            .lock()
            .unwrap()
            .push((post.clone(), remote_id.map(str::to_string)));

        match remote_id {
            None if self.fail_creates => OutboundResult::failed("create rejected"),
            None => {
                let n = self.created.fetch_add(1, Ordering::SeqCst);
                OutboundResult::ok(Some(format!("created-{n}")))
            }
            Some(id) if self.fail_outbound_for.iter().any(|f| f == id) => {
                OutboundResult::failed(format!("update of {id} rejected"))
            }
            Some(id) => OutboundResult::ok(Some(id.to_string())),
        }
    }
}
