//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::EntryOptions;
use crate::engine::coordinator::CycleReport;
use crate::engine::registry::{Instance, IntegrationRegistry, Issue};
use crate::engine::trigger::{TimerFinished, TriggerSource};
use crate::sensors::SensorSet;
use crate::types::LottoError;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub service_name: String,
    pub registry: Arc<IntegrationRegistry>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(service_name: impl Into<String>, registry: Arc<IntegrationRegistry>) -> Self {
        Self {
            service_name: service_name.into(),
            registry,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Maps domain errors onto HTTP statuses.
pub struct ApiError(LottoError);

impl From<LottoError> for ApiError {
    fn from(e: LottoError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LottoError::UnknownEntry(_) => StatusCode::NOT_FOUND,
            LottoError::MissingSelection | LottoError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub entries: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub options: EntryOptions,
    pub trigger: TriggerSource,
    pub cycles: u64,
    pub last_cycle: Option<DateTime<Utc>>,
    pub next_scrape: DateTime<Utc>,
    pub issues: Vec<Issue>,
}

impl EntrySummary {
    async fn from_instance(instance: &Instance) -> Self {
        let snap = instance.coordinator().snapshot().await;
        Self {
            id: instance.id.clone(),
            title: instance.title.clone(),
            options: instance.options().await,
            trigger: instance.trigger_source().await,
            cycles: snap.cycles,
            last_cycle: snap.last_cycle,
            next_scrape: snap.next_scrape,
            issues: instance.issues().await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerAck {
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.service_name.clone(),
        entries: state.registry.list().await.len(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/entries
pub async fn get_entries(State(state): State<AppState>) -> Json<Vec<EntrySummary>> {
    let mut out = Vec::new();
    for instance in state.registry.list().await {
        out.push(EntrySummary::from_instance(&instance).await);
    }
    Json(out)
}

/// GET /api/entries/:id/sensors
pub async fn get_sensors(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SensorSet>, ApiError> {
    let instance = state.registry.get(&id).await?;
    let snap = instance.coordinator().snapshot().await;
    Ok(Json(SensorSet::from_snapshot(&instance.id, &snap)))
}

/// POST /api/entries/:id/update
pub async fn force_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CycleReport>, ApiError> {
    Ok(Json(state.registry.force_update(&id).await?))
}

/// PUT /api/entries/:id/options
pub async fn put_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(options): Json<EntryOptions>,
) -> Result<Json<EntrySummary>, ApiError> {
    state.registry.update_options(&id, options).await?;
    let instance = state.registry.get(&id).await?;
    Ok(Json(EntrySummary::from_instance(&instance).await))
}

/// POST /api/entries/:id/timer
pub async fn timer_finished(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<TimerFinished>,
) -> Result<(StatusCode, Json<TimerAck>), ApiError> {
    let accepted = state.registry.notify_timer(&id, event).await?;
    let status = if accepted { StatusCode::ACCEPTED } else { StatusCode::OK };
    Ok((status, Json(TimerAck { accepted })))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_serializes() {
        let resp = StatusResponse {
            service: "Lotto DK".into(),
            entries: 2,
            uptime_secs: 3600,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Lotto DK"));
        assert!(json.contains("3600"));
    }

    #[test]
    fn test_api_error_statuses() {
        let resp = ApiError(LottoError::UnknownEntry("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError(LottoError::MissingSelection).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = ApiError(LottoError::HostApi("down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_handler() {
        assert_eq!(health().await, StatusCode::OK);
    }
}
