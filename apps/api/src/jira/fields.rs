//! Custom field discovery and value normalization.
//!
//! Jira instances name their custom fields differently, so IDs are looked up by
//! name at runtime (exact match first, then substring) unless configured.
//! Values arrive as plain strings, option objects or ADF documents; all of them
//! are flattened to text here.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::FieldOverrides;

#[derive(Debug, Clone, Deserialize)]
pub struct FieldInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

const STATUS_SUMMARY_NAMES: &[&str] = &["Status Summary", "Latest Status Summary"];
const COLOR_STATUS_NAMES: &[&str] = &["Color Status"];
const PARENT_LINK_NAMES: &[&str] = &["Parent Link"];
const EPIC_LINK_NAMES: &[&str] = &["Epic Link"];

/// Case-insensitive exact name match, falling back to substring match.
pub fn find_field_id(fields: &[FieldInfo], targets: &[&str]) -> Option<String> {
    let targets: Vec<String> = targets.iter().map(|t| t.to_lowercase()).collect();

    let exact = fields
        .iter()
        .find(|f| targets.contains(&f.name.to_lowercase()));
    let fuzzy = || {
        fields.iter().find(|f| {
            let name = f.name.to_lowercase();
            targets.iter().any(|t| name.contains(t.as_str()))
        })
    };

    match exact {
        Some(field) => Some(field.id.clone()),
        None => fuzzy().map(|field| {
            debug!(
                "Field {:?} matched {:?} ({}) by substring",
                targets, field.name, field.id
            );
            field.id.clone()
        }),
    }
}

/// Resolved custom field IDs for one Jira instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIds {
    pub status_summary: Option<String>,
    pub color_status: Option<String>,
    pub parent_link: Option<String>,
    pub epic_link: Option<String>,
}

impl FieldIds {
    /// Configured overrides win; anything else is discovered from the field list.
    pub fn resolve(fields: &[FieldInfo], overrides: &FieldOverrides) -> Self {
        let pick = |configured: &Option<String>, names: &[&str]| {
            configured
                .clone()
                .or_else(|| find_field_id(fields, names))
        };
        Self {
            status_summary: pick(&overrides.status_summary, STATUS_SUMMARY_NAMES),
            color_status: pick(&overrides.color_status, COLOR_STATUS_NAMES),
            parent_link: pick(&overrides.parent_link, PARENT_LINK_NAMES),
            epic_link: pick(&overrides.epic_link, EPIC_LINK_NAMES),
        }
    }

    /// All four IDs when every one is configured, so discovery can be skipped.
    pub fn from_overrides(overrides: &FieldOverrides) -> Option<Self> {
        Some(Self {
            status_summary: Some(overrides.status_summary.clone()?),
            color_status: Some(overrides.color_status.clone()?),
            parent_link: Some(overrides.parent_link.clone()?),
            epic_link: Some(overrides.epic_link.clone()?),
        })
    }

    /// Field list for issue and search requests.
    pub fn request_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = [
            "summary",
            "description",
            "status",
            "priority",
            "issuetype",
            "parent",
            "created",
        ]
        .iter()
        .map(|f| f.to_string())
        .collect();
        fields.extend(
            [
                &self.status_summary,
                &self.color_status,
                &self.parent_link,
                &self.epic_link,
            ]
            .into_iter()
            .flatten()
            .cloned(),
        );
        fields
    }
}

/// Text content of a field value: strings, `{ "value": .. }` options, `{ "name": .. }`
/// objects and ADF documents. Empty results are `None`.
pub fn field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("doc") => {
            adf_to_text(value)
        }
        Value::Object(map) => match map.get("value").or_else(|| map.get("name")) {
            Some(Value::String(s)) => s.clone(),
            _ => return None,
        },
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

const ADF_BLOCKS: &[&str] = &[
    "paragraph",
    "heading",
    "listItem",
    "blockquote",
    "codeBlock",
    "rule",
    "tableRow",
];

/// Flattens an Atlassian Document Format tree to plain text, one line per block.
pub fn adf_to_text(doc: &Value) -> String {
    let mut out = String::new();
    let mut stack: Vec<&Value> = vec![doc];

    while let Some(node) = stack.pop() {
        let node_type = node.get("type").and_then(Value::as_str).unwrap_or_default();
        match node_type {
            "text" => {
                if let Some(text) = node.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
            "hardBreak" => out.push('\n'),
            "mention" | "emoji" => {
                if let Some(text) = node
                    .get("attrs")
                    .and_then(|a| a.get("text"))
                    .and_then(Value::as_str)
                {
                    out.push_str(text);
                }
            }
            _ => {}
        }

        if ADF_BLOCKS.contains(&node_type) && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        if let Some(children) = node.get("content").and_then(Value::as_array) {
            for child in children.iter().rev() {
                stack.push(child);
            }
        }
    }

    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Issue key referenced by a link-type value: `"OPS-1"`, `{ "key": .. }` or
/// `{ "data": { "key": .. } }`.
fn linked_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("key")
            .and_then(Value::as_str)
            .or_else(|| {
                map.get("data")
                    .and_then(|d| d.get("key"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string),
        _ => None,
    }
}

/// Parent key from the standard `parent` field, then Parent Link, then Epic Link.
pub fn parent_key(fields: &Map<String, Value>, ids: &FieldIds) -> Option<String> {
    let standard = fields.get("parent").and_then(linked_key);
    let custom = || {
        [&ids.parent_link, &ids.epic_link]
            .into_iter()
            .flatten()
            .find_map(|id| fields.get(id).and_then(linked_key))
    };
    standard.or_else(custom)
}
