//! Internal cron endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::auth::{extract_bearer_token, validate_cron_secret};
use crate::error::{ApiError, forbidden};
use crate::server::AppState;

/// Triggers one sync batch over every due integration.
///
/// Guarded by the pre-shared cron secret. Per-integration failures are
/// reported inside the body, not through the status code.
#[utoipa::path(
    post,
    path = "/internal/cron/sync",
    responses(
        (status = 200, description = "Batch report", body = crate::sync::CronReport),
        (status = 401, description = "Missing or invalid cron secret", body = ApiError),
        (status = 403, description = "Sync feature disabled", body = ApiError)
    ),
    security(("cron_secret" = [])),
    tag = "cron"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;
    validate_cron_secret(&state.config, token)?;

    if !state.config.sync_enabled {
        return Err(forbidden(Some("Sync is disabled")));
    }

    let report = state.runner.run_once().await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response_headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

    Ok((response_headers, Json(report)).into_response())
}
