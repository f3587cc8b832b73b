use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::issue::Issue;
use crate::models::rollup::Rollup;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RollupRequest {
    pub issues: Vec<Issue>,
    /// Reference instant for recency weighting. Defaults to now.
    #[serde(default, alias = "asOf")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RollupResponse {
    pub run_id: Uuid,
    pub backend: &'static str,
    #[serde(flatten)]
    pub rollup: Rollup,
}

/// POST /api/v1/rollup
pub async fn handle_rollup(
    State(state): State<AppState>,
    Json(req): Json<RollupRequest>,
) -> Result<Json<RollupResponse>, AppError> {
    let run_id = Uuid::new_v4();
    info!("Rollup run {run_id}: {} issues", req.issues.len());

    let rollup = state
        .engine
        .run(&req.issues, req.as_of.unwrap_or_else(Utc::now))?;

    Ok(Json(RollupResponse {
        run_id,
        backend: state.engine.backend(),
        rollup,
    }))
}
