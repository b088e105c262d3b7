use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::warn;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum HealthStatusType {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "error")]
    Error,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    pub status: HealthStatusType,
    /// Authority the signing keys are resolved from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub status_code: StatusCode,
}

impl IntoResponse for Health {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

/// Liveness check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is alive", body = Health)
    )
)]
pub(crate) async fn health_check() -> Health {
    Health {
        status: HealthStatusType::Ok,
        authority: None,
        error: None,
        status_code: StatusCode::OK,
    }
}

/// Readiness check handler, ready once the signing keys of the authority resolve
#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is ready", body = Health),
        (status = 503, description = "Signing keys cannot be resolved", body = Health)
    )
)]
pub(crate) async fn ready_check(State(state): State<AppState>) -> Health {
    let authority = Some(state.settings.auth.issuer().to_string());
    match state.gate.check_keys().await {
        Ok(()) => Health {
            status: HealthStatusType::Ok,
            authority,
            error: None,
            status_code: StatusCode::OK,
        },
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            Health {
                status: HealthStatusType::Error,
                authority,
                error: Some(e.to_string()),
                status_code: StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}
