//! # Server Configuration
//!
//! Router assembly and startup for the integrations service.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::sync::SyncRunner;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub runner: Arc<SyncRunner>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/internal/cron/sync", post(handlers::cron::trigger_sync))
        .route(
            "/integrations/{id}",
            delete(handlers::integrations::delete_integration),
        )
        .route(
            "/integrations/{id}/conflicts",
            get(handlers::integrations::list_conflicts),
        )
        .route(
            "/integrations/{id}/conflicts/{mapping_id}/resolve",
            post(handlers::integrations::resolve_conflict),
        )
        .route(
            "/integrations/{id}/remote-databases",
            get(handlers::integrations::list_remote_databases),
        )
        .route(
            "/integrations/{id}/remote-databases/{database_id}",
            get(handlers::integrations::get_remote_database_schema),
        )
        .route(
            "/integrations/{id}/test",
            post(handlers::integrations::test_connection),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
    runner: Arc<SyncRunner>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let state = AppState { db, config, runner };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::cron::trigger_sync,
        crate::handlers::integrations::delete_integration,
        crate::handlers::integrations::list_conflicts,
        crate::handlers::integrations::resolve_conflict,
        crate::handlers::integrations::list_remote_databases,
        crate::handlers::integrations::get_remote_database_schema,
        crate::handlers::integrations::test_connection,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::error::ProviderErrorDetails,
            crate::handlers::integrations::MappingView,
            crate::handlers::integrations::ResolveRequest,
            crate::providers::trait_::ConnectionCheck,
            crate::providers::trait_::RemoteDatabase,
            crate::providers::trait_::RemoteProperty,
            crate::providers::trait_::RemoteSchema,
            crate::providers::trait_::RemoteStatusOption,
            crate::sync::CronReport,
            crate::sync::CronError,
            crate::sync::Resolution,
        )
    ),
    info(
        title = "Feedback Integrations API",
        description = "Third-party sync engine for feedback boards",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_exposes_admin_surface() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();

        assert!(json.contains("MappingView"));
        assert!(json.contains("/integrations/{id}/conflicts"));
        assert!(json.contains("/integrations/{id}"));
        assert!(json.contains("/internal/cron/sync"));
    }
}
