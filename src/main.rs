//! # Feedback Integrations Service Entry Point

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use integrations::{
    config::ConfigLoader, db::init_pool, server::run_server, sync::SyncRunner, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ConfigLoader::new().load()?);

    telemetry::init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = Arc::new(init_pool(&config).await?);
    integrations::migration::Migrator::up(db.as_ref(), None).await?;

    let runner = Arc::new(SyncRunner::new(db.clone(), config.clone())?);

    // Internal cron manager; the HTTP endpoint remains available for
    // externally driven scheduling.
    let shutdown = CancellationToken::new();
    let loop_handle = tokio::spawn(runner.clone().run_loop(shutdown.clone()));

    let result = run_server(config, db, runner).await;

    shutdown.cancel();
    let _ = loop_handle.await;

    result
}
