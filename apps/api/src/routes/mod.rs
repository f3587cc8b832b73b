pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::report::handlers as report;
use crate::rollup::handlers as rollup;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Roll-up API
        .route("/api/v1/rollup", post(rollup::handle_rollup))
        // Report API
        .route("/api/v1/report", post(report::handle_report))
        .route(
            "/api/v1/hierarchy/:key/report",
            get(report::handle_hierarchy_report),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::errors::AppError;
    use crate::jira::fetcher::{FetchRequest, IssueFetcher};
    use crate::models::issue::fixtures::{issue, with_comment, with_raw_color};
    use crate::models::issue::{ColorStatus, Issue, IssueType};
    use crate::rollup::engine::RollupEngine;

    /// Serves a fixed snapshot and remembers the last request.
    struct FakeFetcher {
        issues: Vec<Issue>,
        last: Mutex<Option<FetchRequest>>,
    }

    #[async_trait]
    impl IssueFetcher for FakeFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Issue>, AppError> {
            if let Ok(mut last) = self.last.lock() {
                *last = Some(request.clone());
            }
            if request.root_key == "GONE-1" {
                return Err(AppError::NotFound("Issue GONE-1 not found".to_string()));
            }
            Ok(self.issues.clone())
        }
    }

    fn snapshot() -> Vec<Issue> {
        vec![
            issue("OPS-1", None),
            with_comment(issue("OPS-2", Some("OPS-1")), "Rollout shipped and stable.", 1),
            with_raw_color(issue("OPS-3", Some("OPS-1")), ColorStatus::Red),
        ]
    }

    fn state(fetcher: Option<Arc<dyn IssueFetcher>>) -> AppState {
        AppState {
            config: Config::from_vars(|_| None).unwrap(),
            engine: Arc::new(RollupEngine::with_defaults()),
            fetcher,
        }
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(state(None), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "pulse-api");
    }

    #[tokio::test]
    async fn test_rollup_annotates_every_issue() {
        let body = json!({
            "as_of": "2025-09-10T12:00:00Z",
            "issues": serde_json::to_value(snapshot()).unwrap()
        });
        let (status, body) = send(state(None), post_json("/api/v1/rollup", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["root_key"], "OPS-1");
        assert_eq!(body["backend"], "lexicon");
        assert!(body["run_id"].is_string());

        let issues = body["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 3);
        let root = &issues[2];
        assert_eq!(root["key"], "OPS-1");
        assert_eq!(root["color_source"], "computed");
        assert_ne!(root["selected_color_status"], "Green");
        assert_eq!(issues[1]["selected_color_status"], "Red");
        assert_eq!(issues[1]["color_source"], "raw");
    }

    #[tokio::test]
    async fn test_rollup_rejects_cycles_with_422() {
        let body = json!({
            "issues": [
                {"key": "A-1", "type": "Story", "parentKey": "A-2", "createdAt": "2025-09-01T00:00:00Z"},
                {"key": "A-2", "type": "Story", "parentKey": "A-1", "createdAt": "2025-09-01T00:00:00Z"}
            ]
        });
        let (status, body) = send(state(None), post_json("/api/v1/rollup", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "MALFORMED_HIERARCHY");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("parent cycle"));
    }

    #[tokio::test]
    async fn test_rollup_rejects_empty_input() {
        let (status, _) = send(state(None), post_json("/api/v1/rollup", json!({"issues": []}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_report_renders_markdown() {
        let body = json!({
            "as_of": "2025-09-10T12:00:00Z",
            "title": "Ops Q3",
            "issues": serde_json::to_value(snapshot()).unwrap()
        });
        let (status, body) = send(state(None), post_json("/api/v1/report", body)).await;
        assert_eq!(status, StatusCode::OK);
        let markdown = body["markdown"].as_str().unwrap();
        assert!(markdown.starts_with("# Status Report: OPS-1: Ops Q3"));
        assert!(markdown.contains("- **OPS-3** Red (raw)"));
    }

    #[tokio::test]
    async fn test_hierarchy_report_without_jira_is_503() {
        let (status, body) = send(state(None), get("/api/v1/hierarchy/OPS-1/report")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "JIRA_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_hierarchy_report_uses_fetcher() {
        let fake = Arc::new(FakeFetcher {
            issues: snapshot(),
            last: Mutex::new(None),
        });
        let (status, body) = send(
            state(Some(fake.clone())),
            get("/api/v1/hierarchy/ops-1/report?issue_type=initiative&days=14"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["markdown"]
            .as_str()
            .unwrap()
            .contains("Comments from the last 14 days"));

        let last = fake.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.root_key, "OPS-1");
        assert_eq!(last.issue_type, Some(IssueType::Initiative));
        assert_eq!(last.lookback_days, 14);
    }

    #[tokio::test]
    async fn test_hierarchy_report_defaults_lookback_from_config() {
        let fake = Arc::new(FakeFetcher {
            issues: snapshot(),
            last: Mutex::new(None),
        });
        let (status, _) = send(state(Some(fake.clone())), get("/api/v1/hierarchy/OPS-1/report")).await;
        assert_eq!(status, StatusCode::OK);
        let last = fake.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.lookback_days, 7);
        assert_eq!(last.issue_type, None);
    }

    #[tokio::test]
    async fn test_hierarchy_report_validation() {
        let fake: Arc<dyn IssueFetcher> = Arc::new(FakeFetcher {
            issues: snapshot(),
            last: Mutex::new(None),
        });

        let (status, _) = send(
            state(Some(fake.clone())),
            get("/api/v1/hierarchy/not%20a%20key/report"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            state(Some(fake.clone())),
            get("/api/v1/hierarchy/OPS-1/report?days=0"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            state(Some(fake)),
            get("/api/v1/hierarchy/OPS-1/report?issue_type=saga"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_hierarchy_report_missing_root_is_404() {
        let fake: Arc<dyn IssueFetcher> = Arc::new(FakeFetcher {
            issues: vec![],
            last: Mutex::new(None),
        });
        let (status, body) = send(state(Some(fake)), get("/api/v1/hierarchy/GONE-1/report")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
