use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::jira::fields::{field_text, parent_key, FieldIds};
use crate::jira::{JiraError, RawComment, RawIssue};
use crate::models::issue::{ColorStatus, Comment, Issue, IssueType, Priority};

/// Jira timestamps: RFC 3339, or Jira's own `2025-09-08T10:00:00.000+0000`.
pub fn parse_jira_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Keeps non-empty comments created at or after `cutoff`. Comments with a
/// missing or unreadable timestamp are dropped.
pub fn map_comments(raw: &[RawComment], cutoff: DateTime<Utc>) -> Vec<Comment> {
    raw.iter()
        .filter_map(|c| {
            let created = c.created.as_deref().and_then(parse_jira_timestamp)?;
            if created < cutoff {
                return None;
            }
            let body = field_text(&c.body)?;
            Some(Comment { body, created })
        })
        .collect()
}

fn nested_name<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    fields
        .get(field)
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
}

/// Maps a Jira issue onto the roll-up's input model. Missing fields fall back
/// to defaults; only a missing key is an error.
pub fn map_issue(
    raw: &RawIssue,
    ids: &FieldIds,
    comments: Vec<Comment>,
) -> Result<Issue, JiraError> {
    if raw.key.trim().is_empty() {
        return Err(JiraError::Shape("issue without a key".to_string()));
    }
    let fields = &raw.fields;
    let custom_text = |id: &Option<String>| {
        id.as_deref()
            .and_then(|id| fields.get(id))
            .and_then(field_text)
    };

    let raw_color_status = match custom_text(&ids.color_status).map(|t| t.parse::<ColorStatus>()) {
        Some(Ok(color)) => Some(color),
        Some(Err(e)) => {
            warn!("{}: ignoring color status: {e}", raw.key);
            None
        }
        None => None,
    };

    Ok(Issue {
        key: raw.key.clone(),
        issue_type: nested_name(fields, "issuetype")
            .map(IssueType::from_jira_name)
            .unwrap_or(IssueType::Task),
        parent_key: parent_key(fields, ids),
        summary: fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: fields.get("description").and_then(field_text),
        comments,
        status: nested_name(fields, "status").unwrap_or_default().to_string(),
        priority: nested_name(fields, "priority").and_then(Priority::from_jira_name),
        raw_status_summary: custom_text(&ids.status_summary),
        raw_color_status,
        created_at: fields
            .get("created")
            .and_then(Value::as_str)
            .and_then(parse_jira_timestamp)
            .unwrap_or_default(),
    })
}
