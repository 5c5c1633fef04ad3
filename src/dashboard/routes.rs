//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::orchestrator::{Orchestrator, TickPhase};
use crate::registry::WeightRegistry;
use crate::types::{Action, ModelWeight, RecalibrationResult, TrustInfo};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub registry: Arc<WeightRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl DashboardState {
    pub fn new(registry: Arc<WeightRegistry>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            registry,
            orchestrator,
            started_at: chrono::Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub tick_phase: TickPhase,
    /// Number of recalibration ticks published since startup.
    pub snapshot_version: u64,
    pub uptime_secs: i64,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = (chrono::Utc::now() - state.started_at).num_seconds();
    Json(HealthResponse {
        status: "ok".to_string(),
        tick_phase: state.orchestrator.phase(),
        snapshot_version: state.registry.version(),
        uptime_secs: uptime,
    })
}

/// GET /api/recalibration — latest published snapshot. 404 before the
/// first tick completes.
pub async fn get_recalibration(
    State(state): State<AppState>,
) -> Result<Json<RecalibrationResult>, StatusCode> {
    match state.registry.latest_recalibration() {
        Some(snapshot) => Ok(Json((*snapshot).clone())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/weights — current weight set, neutral before the first tick.
pub async fn get_weights(State(state): State<AppState>) -> Json<Vec<ModelWeight>> {
    Json(state.registry.current_weights().into_values().collect())
}

/// GET /api/trust/:algorithm_id
pub async fn get_trust(
    State(state): State<AppState>,
    Path(algorithm_id): Path<String>,
) -> Json<TrustInfo> {
    Json(state.registry.trust(&algorithm_id))
}

/// GET /api/actions — last 100 audit entries, newest last.
pub async fn get_actions(State(state): State<AppState>) -> Json<Vec<Action>> {
    let actions = state.registry.actions();
    let start = actions.len().saturating_sub(100);
    Json(actions[start..].to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
