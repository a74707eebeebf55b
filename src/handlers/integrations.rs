//! Integration admin endpoints: discovery passthrough, connectivity test,
//! and conflict inspection/resolution.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::SecretCipher;
use crate::error::{ApiError, provider_error};
use crate::models::integration;
use crate::models::integration_mapping;
use crate::providers::config::IntegrationConfig;
use crate::providers::trait_::{ConnectionCheck, RemoteDatabase, RemoteProvider, RemoteSchema};
use crate::providers::ProviderFactory;
use crate::repositories::{IntegrationRepository, MappingRepository, PostRepository};
use crate::server::AppState;
use crate::sync::{ConflictResolver, Resolution, ResolveError};

/// Admin view of one mapping row.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MappingView {
    pub id: Uuid,
    pub integration_id: Uuid,
    pub local_type: String,
    pub local_id: Uuid,
    pub remote_id: String,
    pub status: String,
    #[schema(value_type = Option<String>, example = "2025-01-01T12:00:00Z")]
    pub last_synced_at: Option<DateTimeWithTimeZone>,
    pub last_error: Option<String>,
}

impl From<integration_mapping::Model> for MappingView {
    fn from(model: integration_mapping::Model) -> Self {
        Self {
            id: model.id,
            integration_id: model.integration_id,
            local_type: model.local_type,
            local_id: model.local_id,
            remote_id: model.remote_id,
            status: model.status,
            last_synced_at: model.last_synced_at,
            last_error: model.last_error,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResolveRequest {
    pub resolution: Resolution,
}

/// Loads an integration and builds its provider, decrypting the stored
/// credential. Shared by every handler below.
async fn load_provider(
    state: &AppState,
    integration_id: Uuid,
) -> Result<(integration::Model, IntegrationConfig, Arc<dyn RemoteProvider>), ApiError> {
    let repo = IntegrationRepository::new(state.db.clone());
    let integration = repo
        .find_by_id(integration_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Integration not found"))?;

    let provider_type = integration.provider_type().ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Unknown provider",
        )
    })?;
    let config = IntegrationConfig::parse(&integration.config)?;

    let cipher = SecretCipher::new(state.config.encryption_secret.clone());
    let api_key = config.decrypt_api_key(&cipher).map_err(|err| {
        tracing::error!(integration_id = %integration.id, error = %err, "credential decryption failed");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Credential decryption failed",
        )
    })?;

    let factory = ProviderFactory::from_config(&state.config)?;
    let provider = factory.build(provider_type, &config, api_key)?;

    Ok((integration, config, provider))
}

/// Lists unresolved conflict mappings for an integration.
#[utoipa::path(
    get,
    path = "/integrations/{id}/conflicts",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 200, description = "Conflicted mappings", body = [MappingView]),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn list_conflicts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MappingView>>, ApiError> {
    let repo = IntegrationRepository::new(state.db.clone());
    if repo.find_by_id(id).await?.is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Integration not found",
        ));
    }

    let mappings = MappingRepository::new(state.db.clone())
        .list_conflicts(id)
        .await?;
    Ok(Json(mappings.into_iter().map(MappingView::from).collect()))
}

/// Resolves one conflicted mapping in favor of the local or remote side.
#[utoipa::path(
    post,
    path = "/integrations/{id}/conflicts/{mapping_id}/resolve",
    params(
        ("id" = Uuid, Path, description = "Integration ID"),
        ("mapping_id" = Uuid, Path, description = "Mapping ID")
    ),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved mapping", body = MappingView),
        (status = 404, description = "Integration or mapping not found", body = ApiError),
        (status = 409, description = "Mapping is not in conflict", body = ApiError),
        (status = 502, description = "Provider failure, conflict unresolved", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    Path((id, mapping_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<MappingView>, ApiError> {
    let (integration, config, provider) = load_provider(&state, id).await?;

    let resolver = ConflictResolver::new(state.db.clone());
    let mapping = resolver
        .resolve(
            &integration,
            &config,
            provider.as_ref(),
            mapping_id,
            body.resolution,
        )
        .await
        .map_err(|err| match err {
            ResolveError::NotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Mapping not found")
            }
            ResolveError::NotInConflict => ApiError::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                "Mapping is not in conflict",
            ),
            ResolveError::RemoteGone => {
                provider_error("notion".to_string(), 404, Some("remote page not found".into()))
            }
            ResolveError::Provider(message) => {
                provider_error("notion".to_string(), 0, Some(message))
            }
            ResolveError::LocalMissing(_) | ResolveError::Database(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Conflict resolution failed",
            ),
        })?;

    Ok(Json(MappingView::from(mapping)))
}

/// Lists syncable databases visible to the integration's credential.
#[utoipa::path(
    get,
    path = "/integrations/{id}/remote-databases",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 200, description = "Remote databases", body = [RemoteDatabase]),
        (status = 404, description = "Integration not found", body = ApiError),
        (status = 502, description = "Provider failure", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn list_remote_databases(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RemoteDatabase>>, ApiError> {
    let (_, _, provider) = load_provider(&state, id).await?;
    let databases = provider.list_remote_databases().await?;
    Ok(Json(databases))
}

/// Fetches the schema of one remote database for mapping setup.
#[utoipa::path(
    get,
    path = "/integrations/{id}/remote-databases/{database_id}",
    params(
        ("id" = Uuid, Path, description = "Integration ID"),
        ("database_id" = String, Path, description = "Remote database ID")
    ),
    responses(
        (status = 200, description = "Remote database schema", body = RemoteSchema),
        (status = 404, description = "Integration not found", body = ApiError),
        (status = 502, description = "Provider failure", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn get_remote_database_schema(
    State(state): State<AppState>,
    Path((id, database_id)): Path<(Uuid, String)>,
) -> Result<Json<RemoteSchema>, ApiError> {
    let (_, _, provider) = load_provider(&state, id).await?;
    let schema = provider.database_schema(&database_id).await?;
    Ok(Json(schema))
}

/// Deletes an integration along with its mappings and the posts its inbound
/// pulls created. Posts that existed locally before being linked stay put.
#[utoipa::path(
    delete,
    path = "/integrations/{id}",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 204, description = "Integration deleted"),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn delete_integration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = IntegrationRepository::new(state.db.clone());
    if repo.find_by_id(id).await?.is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Integration not found",
        ));
    }

    let mappings = MappingRepository::new(state.db.clone());
    let inbound_post_ids = mappings.list_inbound_local_ids(id).await?;
    let removed_posts = PostRepository::new(state.db.clone())
        .delete_many(&inbound_post_ids)
        .await?;
    let removed_mappings = mappings.delete_for_integration(id).await?;
    repo.delete(id).await?;

    tracing::info!(
        integration_id = %id,
        removed_posts,
        removed_mappings,
        "integration deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Probes the integration's connectivity and credential.
#[utoipa::path(
    post,
    path = "/integrations/{id}/test",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 200, description = "Connectivity check outcome", body = ConnectionCheck),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionCheck>, ApiError> {
    let (_, _, provider) = load_provider(&state, id).await?;
    Ok(Json(provider.test_connection().await))
}
