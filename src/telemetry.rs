//! Global tracing setup plus task-scoped trace correlation.
//!
//! Every HTTP response and sync run carries a short trace ID so log lines,
//! problem documents, and sync log rows for one unit of work can be joined.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
};
use uuid::Uuid;

use crate::config::AppConfig;

/// Correlation metadata bound to the task handling one request or sync run.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

impl TraceContext {
    /// Context for an HTTP request that arrived without upstream correlation.
    pub fn for_request() -> Self {
        Self {
            trace_id: format!("corr-{}", short_id()),
        }
    }

    /// Context for one scheduled sync run of a single integration.
    pub fn for_sync_run() -> Self {
        Self {
            trace_id: format!("sync-{}", short_id()),
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

/// Output shape of the fmt layer. Anything unrecognized falls back to JSON,
/// the shape log shippers expect in deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw {
            "pretty" => Self::Pretty,
            _ => Self::Json,
        }
    }

    fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        match self {
            Self::Pretty => fmt::layer().pretty().boxed(),
            Self::Json => fmt::layer().json().boxed(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing exactly once. Subsequent calls are no-ops, so
/// embedding binaries and test harnesses can call this freely.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    install_log_bridge();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let fmt_layer = LogFormat::parse(&config.log_format).layer();

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: failed to set global tracing subscriber: {}. Default subscriber remains in effect.",
            err
        );
    }

    Ok(())
}

/// Route `log::` macros from dependencies into the tracing pipeline. A logger
/// installed earlier by the host process keeps working; only its `log::`
/// output bypasses tracing, so report that and move on.
fn install_log_bridge() {
    let bridge = LogTracer::builder().with_max_level(LevelFilter::Trace);
    if let Err(err) = bridge.init() {
        eprintln!(
            "Warning: log tracer bridge not installed ({}); `log::` macros keep their existing logger.",
            err
        );
    }
}

/// Run `future` with the given trace context bound to the current task.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// The trace ID bound to the running task, if any.
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|ctx| ctx.trace_id.clone())
        .ok()
}
