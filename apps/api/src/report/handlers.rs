//! Axum route handlers for the Report API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jira::fetcher::FetchRequest;
use crate::jira::jql::is_valid_issue_key;
use crate::models::issue::{Issue, IssueType};
use crate::models::rollup::Rollup;
use crate::report::markdown::{render_markdown, ReportOptions};
use crate::state::AppState;

const MAX_LOOKBACK_DAYS: u32 = 90;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub issues: Vec<Issue>,
    #[serde(default, alias = "asOf")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HierarchyReportQuery {
    /// Root type override; the root's own Jira type is used when absent.
    pub issue_type: Option<String>,
    pub days: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub run_id: Uuid,
    pub markdown: String,
    #[serde(flatten)]
    pub rollup: Rollup,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/report
///
/// Rolls up a caller-supplied snapshot and renders the markdown report.
pub async fn handle_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let run_id = Uuid::new_v4();
    let rollup = state
        .engine
        .run(&req.issues, req.as_of.unwrap_or_else(Utc::now))?;
    let markdown = render_markdown(
        &rollup,
        &ReportOptions {
            title: req.title,
            lookback_days: None,
        },
    );
    info!("Report run {run_id}: {} issues under {}", rollup.issues.len(), rollup.root_key);

    Ok(Json(ReportResponse {
        run_id,
        markdown,
        rollup,
    }))
}

/// GET /api/v1/hierarchy/:key/report?issue_type=&days=&title=
///
/// Fetches the hierarchy under `key` from Jira, rolls it up and renders it.
pub async fn handle_hierarchy_report(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<HierarchyReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let fetcher = state.fetcher.as_ref().ok_or(AppError::JiraNotConfigured)?;

    let root_key = key.trim().to_uppercase();
    if !is_valid_issue_key(&root_key) {
        return Err(AppError::Validation(format!(
            "'{key}' is not a valid issue key (expected PROJECT-123)"
        )));
    }

    let issue_type = params
        .issue_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::parse::<IssueType>)
        .transpose()
        .map_err(AppError::Validation)?;

    let lookback_days = params.days.unwrap_or(state.config.lookback_days);
    if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_LOOKBACK_DAYS}"
        )));
    }

    let run_id = Uuid::new_v4();
    let as_of = Utc::now();
    info!("Report run {run_id}: fetching {root_key} (last {lookback_days} days)");

    let issues = fetcher
        .fetch(&FetchRequest {
            root_key,
            issue_type,
            lookback_days,
            as_of,
        })
        .await?;
    let rollup = state.engine.run(&issues, as_of)?;
    let markdown = render_markdown(
        &rollup,
        &ReportOptions {
            title: params.title,
            lookback_days: Some(lookback_days),
        },
    );

    Ok(Json(ReportResponse {
        run_id,
        markdown,
        rollup,
    }))
}
