use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::issue::{ColorStatus, Issue};

/// Where a selected value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Raw,
    Computed,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Raw => "raw",
            ValueSource::Computed => "computed",
        }
    }
}

/// Per-issue sentiment and risk reading that feeds the issue's own color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSignal {
    /// Weighted compound polarity in [-1, 1].
    pub compound: f64,
    pub risk: bool,
    pub positive: bool,
    pub insufficient_data: bool,
}

/// An input issue plus everything the roll-up derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub children: Vec<String>,
    pub depth: usize,
    /// Only present when no raw summary existed.
    pub computed_status_summary: Option<String>,
    pub selected_status_summary: String,
    pub summary_source: ValueSource,
    /// Only present when no raw color existed.
    pub computed_color_status: Option<ColorStatus>,
    pub selected_color_status: ColorStatus,
    pub color_source: ValueSource,
    pub signal: IssueSignal,
}

/// Output of one engine run. `issues` is in post-order, so the root is last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub root_key: String,
    pub as_of: DateTime<Utc>,
    pub issues: Vec<AnnotatedIssue>,
}

impl Rollup {
    pub fn get(&self, key: &str) -> Option<&AnnotatedIssue> {
        self.issues.iter().find(|a| a.issue.key == key)
    }

    pub fn root(&self) -> Option<&AnnotatedIssue> {
        self.get(&self.root_key)
    }

    /// Issues in pre-order (parent before children, children in roll-up order).
    pub fn pre_order(&self) -> Vec<&AnnotatedIssue> {
        let by_key: HashMap<&str, &AnnotatedIssue> = self
            .issues
            .iter()
            .map(|a| (a.issue.key.as_str(), a))
            .collect();

        let mut ordered = Vec::with_capacity(self.issues.len());
        let mut stack: Vec<&str> = vec![self.root_key.as_str()];
        while let Some(key) = stack.pop() {
            let Some(annotated) = by_key.get(key) else {
                continue;
            };
            ordered.push(*annotated);
            for child in annotated.children.iter().rev() {
                stack.push(child.as_str());
            }
        }
        ordered
    }
}
