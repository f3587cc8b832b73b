/// Jira Client: the single point of entry for all Jira REST calls.
///
/// No other module talks to Jira directly; the fetcher composes these calls
/// into a hierarchy snapshot.
///
/// Auth: HTTP basic with account email + API token.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::JiraConfig;

pub mod fetcher;
pub mod fields;
pub mod jql;
pub mod mapping;

const MAX_RETRIES: u32 = 3;
const SEARCH_PAGE_SIZE: u32 = 100;
/// Upper bound on descendants pulled for one report.
const MAX_SEARCH_RESULTS: usize = 1000;
const COMMENT_PAGE_SIZE: u32 = 100;
pub const MAX_COMMENTS: usize = 200;

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized (401): check JIRA_EMAIL and JIRA_API_TOKEN")]
    Unauthorized,

    #[error("Forbidden (403): check permissions and project access")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Jira unavailable after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

/// Issue as returned by `/issue/{key}` and `/search`: key plus a loose field map.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    /// Plain string on API v2, ADF document on v3.
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentPage {
    #[serde(default)]
    comments: Vec<RawComment>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Wraps the Jira REST API with retry logic and pagination helpers.
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
    api_version: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self, JiraError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            api_token: config.api_token.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/{}{}", self.base_url, self.api_version, path)
    }

    /// GET with retries on 429 and 5xx (exponential backoff: 1s, 2s).
    /// 401, 403 and 404 fail immediately with their own variants.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, JiraError> {
        let url = self.api(path);
        let mut last_error: Option<JiraError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Jira GET {path} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&url)
                .basic_auth(&self.email, Some(&self.api_token))
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_error = Some(JiraError::Http(e));
                    continue;
                }
                Err(e) => return Err(JiraError::Http(e)),
            };

            let status = response.status();
            match status {
                StatusCode::UNAUTHORIZED => return Err(JiraError::Unauthorized),
                StatusCode::FORBIDDEN => return Err(JiraError::Forbidden),
                StatusCode::NOT_FOUND => return Err(JiraError::NotFound(path.to_string())),
                _ => {}
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Jira API returned {}: {}", status, body);
                last_error = Some(JiraError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(JiraError::Api {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }

            let body = response.text().await?;
            debug!("Jira GET {path} succeeded ({} bytes)", body.len());
            return serde_json::from_str(&body).map_err(JiraError::Parse);
        }

        Err(last_error.unwrap_or(JiraError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }

    /// All field definitions, used to discover custom field IDs by name.
    pub async fn fields(&self) -> Result<Vec<fields::FieldInfo>, JiraError> {
        self.get("/field", &[]).await
    }

    pub async fn issue(&self, key: &str, fields: &[String]) -> Result<RawIssue, JiraError> {
        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        self.get(&format!("/issue/{key}"), &query).await
    }

    /// Runs a JQL search, following `startAt` pagination until exhausted.
    pub async fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<RawIssue>, JiraError> {
        let mut issues: Vec<RawIssue> = Vec::new();
        loop {
            let mut query = vec![
                ("jql", jql.to_string()),
                ("startAt", issues.len().to_string()),
                ("maxResults", SEARCH_PAGE_SIZE.to_string()),
            ];
            if !fields.is_empty() {
                query.push(("fields", fields.join(",")));
            }

            let page: SearchPage = self.get("/search", &query).await?;
            let returned = page.issues.len();
            issues.extend(page.issues);

            if !has_more(issues.len(), returned, page.total, MAX_SEARCH_RESULTS) {
                break;
            }
        }
        issues.truncate(MAX_SEARCH_RESULTS);
        debug!("JQL search returned {} issues", issues.len());
        Ok(issues)
    }

    /// Comments for one issue, oldest first as Jira returns them, capped at `MAX_COMMENTS`.
    pub async fn comments(&self, key: &str) -> Result<Vec<RawComment>, JiraError> {
        let mut comments: Vec<RawComment> = Vec::new();
        let path = format!("/issue/{key}/comment");
        loop {
            let remaining = MAX_COMMENTS.saturating_sub(comments.len()) as u32;
            let query = [
                ("startAt", comments.len().to_string()),
                ("maxResults", remaining.min(COMMENT_PAGE_SIZE).to_string()),
            ];

            let page: CommentPage = self.get(&path, &query).await?;
            let returned = page.comments.len();
            comments.extend(page.comments);

            if !has_more(comments.len(), returned, page.total, MAX_COMMENTS) {
                break;
            }
        }
        comments.truncate(MAX_COMMENTS);
        Ok(comments)
    }
}

/// Whether another page should be requested.
fn has_more(fetched: usize, returned: usize, total: usize, cap: usize) -> bool {
    returned > 0 && fetched < total && fetched < cap
}

/// Prefers Jira's `errorMessages` over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<JiraErrorBody>(body)
        .ok()
        .filter(|e| !e.error_messages.is_empty())
        .map(|e| e.error_messages.join("; "))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldOverrides, JiraConfig};

    fn config() -> JiraConfig {
        JiraConfig {
            base_url: "https://example.atlassian.net/".to_string(),
            email: "pm@example.com".to_string(),
            api_token: "token".to_string(),
            api_version: "3".to_string(),
            timeout_secs: 5,
            fields: FieldOverrides::default(),
        }
    }

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let client = JiraClient::new(&config()).unwrap();
        assert_eq!(
            client.api("/issue/OPS-1"),
            "https://example.atlassian.net/rest/api/3/issue/OPS-1"
        );
    }

    #[test]
    fn test_has_more_stops_on_total_cap_or_empty_page() {
        assert!(has_more(100, 100, 250, 1000));
        assert!(!has_more(250, 50, 250, 1000));
        assert!(!has_more(100, 0, 250, 1000));
        assert!(!has_more(200, 100, 500, 200));
    }

    #[test]
    fn test_error_message_prefers_error_messages() {
        let body = r#"{"errorMessages":["Field 'cf[10014]' does not exist"],"errors":{}}"#;
        assert_eq!(error_message(body), "Field 'cf[10014]' does not exist");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_search_page_deserializes() {
        let json = r#"{
            "startAt": 0, "maxResults": 100, "total": 1,
            "issues": [{"key": "OPS-2", "fields": {"summary": "Rate limits"}}]
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.issues[0].key, "OPS-2");
        assert_eq!(page.issues[0].fields["summary"], "Rate limits");
    }

    #[test]
    fn test_comment_page_accepts_adf_bodies() {
        let json = r#"{
            "total": 1,
            "comments": [{
                "created": "2025-09-08T10:00:00.000+0000",
                "body": {"type": "doc", "content": []}
            }]
        }"#;
        let page: CommentPage = serde_json::from_str(json).unwrap();
        assert!(page.comments[0].body.is_object());
    }
}
