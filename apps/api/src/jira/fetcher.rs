//! Issue Fetcher: pluggable source of hierarchy snapshots.
//!
//! Default: `JiraIssueFetcher` (root by key, descendants by JQL, comments per issue).
//! `AppState` holds an `Option<Arc<dyn IssueFetcher>>`; `None` when Jira is not configured.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::FieldOverrides;
use crate::errors::AppError;
use crate::jira::fields::FieldIds;
use crate::jira::jql::TraversalPattern;
use crate::jira::mapping::{map_comments, map_issue};
use crate::jira::{JiraClient, JiraError, RawIssue};
use crate::models::issue::{Issue, IssueType};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub root_key: String,
    /// Root type used to pick the traversal pattern. Defaults to the root's Jira type.
    pub issue_type: Option<IssueType>,
    /// Comments older than this many days before `as_of` are dropped.
    pub lookback_days: u32,
    pub as_of: DateTime<Utc>,
}

/// Produces a snapshot that forms a single rooted tree under `root_key`.
#[async_trait]
pub trait IssueFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Issue>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// JiraIssueFetcher
// ────────────────────────────────────────────────────────────────────────────

pub struct JiraIssueFetcher {
    client: JiraClient,
    overrides: FieldOverrides,
    /// Discovered once per process.
    field_ids: OnceCell<FieldIds>,
}

impl JiraIssueFetcher {
    pub fn new(client: JiraClient, overrides: FieldOverrides) -> Self {
        Self {
            client,
            overrides,
            field_ids: OnceCell::new(),
        }
    }

    async fn field_ids(&self) -> Result<&FieldIds, JiraError> {
        self.field_ids
            .get_or_try_init(|| async {
                if let Some(ids) = FieldIds::from_overrides(&self.overrides) {
                    return Ok(ids);
                }
                let catalog = self.client.fields().await?;
                let ids = FieldIds::resolve(&catalog, &self.overrides);
                info!(
                    "Jira fields: status_summary={:?} color_status={:?} parent_link={:?} epic_link={:?}",
                    ids.status_summary, ids.color_status, ids.parent_link, ids.epic_link
                );
                Ok::<_, JiraError>(ids)
            })
            .await
    }

    async fn root(&self, key: &str, fields: &[String]) -> Result<RawIssue, AppError> {
        match self.client.issue(key, fields).await {
            Ok(raw) => Ok(raw),
            Err(JiraError::NotFound(_)) => Err(AppError::NotFound(format!("Issue {key} not found"))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl IssueFetcher for JiraIssueFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Issue>, AppError> {
        let ids = self.field_ids().await?;
        let fields = ids.request_fields();

        let root = self.root(&request.root_key, &fields).await?;
        let root_key = root.key.clone();
        let root_type = match request.issue_type {
            Some(issue_type) => issue_type,
            None => map_issue(&root, ids, vec![])?.issue_type,
        };

        let pattern = TraversalPattern::for_root(root_type);
        let jql = pattern.descendants_jql(&root_key, ids.epic_link.as_deref());
        info!("Fetching {root_key} ({root_type}) via {}: {jql}", pattern.as_str());

        let mut seen: HashSet<String> = HashSet::from([root_key.clone()]);
        let descendants: Vec<RawIssue> = self
            .client
            .search(&jql, &fields)
            .await?
            .into_iter()
            .filter(|raw| seen.insert(raw.key.clone()))
            .collect();

        let cutoff = request.as_of - Duration::days(i64::from(request.lookback_days));
        let mut issues = Vec::with_capacity(descendants.len() + 1);
        for raw in std::iter::once(&root).chain(descendants.iter()) {
            // Comment failures degrade to "no recent comments" rather than failing the report.
            let comments = match self.client.comments(&raw.key).await {
                Ok(comments) => map_comments(&comments, cutoff),
                Err(e) => {
                    warn!("{}: could not load comments: {e}", raw.key);
                    vec![]
                }
            };
            issues.push(map_issue(raw, ids, comments)?);
        }

        if let Some(first) = issues.first_mut() {
            first.parent_key = None;
        }
        let reattached = attach_orphans(&root_key, &mut issues);
        info!(
            "Fetched {} issues under {root_key} ({reattached} re-attached to root)",
            issues.len()
        );
        Ok(issues)
    }
}

/// Re-parents descendants whose parent is absent from the snapshot (filtered out
/// by status, or never linked) onto the root. Returns how many moved.
pub fn attach_orphans(root_key: &str, issues: &mut [Issue]) -> usize {
    let keys: HashSet<String> = issues.iter().map(|i| i.key.clone()).collect();
    let mut moved = 0;

    for issue in issues.iter_mut().filter(|i| i.key != root_key) {
        let attached = issue
            .parent_key
            .as_deref()
            .is_some_and(|parent| keys.contains(parent));
        if !attached {
            warn!(
                "{}: parent {:?} not in snapshot, attaching to {root_key}",
                issue.key, issue.parent_key
            );
            issue.parent_key = Some(root_key.to_string());
            moved += 1;
        }
    }
    moved
}
