//! Cron runner
//!
//! Evaluates which integrations are due, runs them strictly sequentially,
//! and reports per-integration outcomes. Also runnable as a background loop
//! driven by a tick interval and a cancellation token.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::crypto::SecretCipher;
use crate::providers::ProviderFactory;
use crate::providers::config::IntegrationConfig;
use crate::providers::trait_::ProviderError;
use crate::repositories::{IntegrationRepository, integration::is_due};
use crate::sync::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::telemetry::{self, TraceContext};

/// Per-integration failure inside a cron batch.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CronError {
    pub integration_id: Uuid,
    pub error: String,
}

/// Outcome of one cron batch.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct CronReport {
    /// Integrations that completed a sync run, item failures included.
    pub processed: u64,
    /// Integrations evaluated but not yet due.
    pub skipped: u64,
    pub errors: Vec<CronError>,
}

pub struct SyncRunner {
    integrations: IntegrationRepository,
    orchestrator: SyncOrchestrator,
    cipher: SecretCipher,
    factory: ProviderFactory,
    config: Arc<AppConfig>,
}

impl SyncRunner {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Result<Self, ProviderError> {
        let factory = ProviderFactory::from_config(&config)?;
        Ok(Self {
            integrations: IntegrationRepository::new(db.clone()),
            orchestrator: SyncOrchestrator::new(db, config.scheduler.skew_tolerance_seconds),
            cipher: SecretCipher::new(config.encryption_secret.clone()),
            factory,
            config,
        })
    }

    /// Runs one batch: every enabled, scheduled integration is evaluated;
    /// due ones run sequentially, never-synced first then oldest. A failing
    /// integration is recorded and the batch continues.
    pub async fn run_once(&self) -> Result<CronReport> {
        if !self.config.sync_enabled {
            return Ok(CronReport::default());
        }

        let now = Utc::now();
        let candidates = self.integrations.find_enabled_scheduled().await?;

        let (mut due, not_due): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|row| is_due(row, now));
        let skipped = not_due.len() as u64;
        due.sort_by_key(|row| row.last_sync_at.map(|last| last.with_timezone(&Utc)));

        let mut report = CronReport {
            processed: 0,
            skipped,
            errors: Vec::new(),
        };

        for integration in due {
            let trace = TraceContext::for_sync_run();
            match telemetry::with_trace_context(trace, self.sync_one_id(integration.id)).await {
                Ok(outcome) => {
                    report.processed += 1;
                    counter!("sync_runs_total").increment(1);
                    histogram!("sync_run_items").record(outcome.summary.items as f64);
                }
                Err(err) => {
                    warn!(integration_id = %integration.id, error = %err, "sync run failed");
                    counter!("sync_run_failures_total").increment(1);
                    report.errors.push(CronError {
                        integration_id: integration.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Decrypts the integration's credential, builds its provider, and runs
    /// the orchestrator.
    pub async fn sync_one_id(&self, integration_id: Uuid) -> Result<SyncOutcome> {
        let integration = self
            .integrations
            .find_by_id(integration_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("integration {} not found", integration_id))?;

        let provider_type = integration
            .provider_type()
            .ok_or_else(|| anyhow::anyhow!("unknown provider '{}'", integration.provider))?;
        let config = IntegrationConfig::parse(&integration.config)?;
        let api_key = config.decrypt_api_key(&self.cipher)?;
        let provider = self.factory.build(provider_type, &config, api_key)?;

        Ok(self
            .orchestrator
            .run(&integration, &config, provider.as_ref())
            .await?)
    }

    /// Background loop: one batch per tick until cancelled.
    pub async fn run_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let tick = TokioDuration::from_secs(self.config.scheduler.tick_interval_seconds);
        info!(tick_seconds = tick.as_secs(), "sync runner loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("sync runner loop stopping");
                    break;
                }
                _ = sleep(tick) => {
                    let started = Instant::now();
                    match self.run_once().await {
                        Ok(report) => {
                            info!(
                                processed = report.processed,
                                skipped = report.skipped,
                                errors = report.errors.len(),
                                "cron batch finished"
                            );
                        }
                        Err(err) => {
                            error!(error = %err, "cron batch failed");
                        }
                    }
                    histogram!("sync_cron_tick_duration_ms")
                        .record(started.elapsed().as_millis() as f64);
                }
            }
        }
    }
}
