use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Jira issue types that can appear in a status hierarchy.
/// Governs which traversal pattern applies when the issue is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Outcome,
    Initiative,
    Feature,
    Epic,
    Story,
    Task,
}

impl IssueType {
    /// Maps a Jira issue type name onto the hierarchy levels we understand.
    /// Sub-tasks, bugs and anything unrecognized are treated as leaf-level tasks.
    pub fn from_jira_name(name: &str) -> Self {
        name.parse().unwrap_or(IssueType::Task)
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outcome" => Ok(IssueType::Outcome),
            "initiative" => Ok(IssueType::Initiative),
            "feature" => Ok(IssueType::Feature),
            "epic" => Ok(IssueType::Epic),
            "story" | "user story" => Ok(IssueType::Story),
            "task" | "sub-task" | "subtask" => Ok(IssueType::Task),
            other => Err(format!("unknown issue type '{other}'")),
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueType::Outcome => "Outcome",
            IssueType::Initiative => "Initiative",
            IssueType::Feature => "Feature",
            IssueType::Epic => "Epic",
            IssueType::Story => "Story",
            IssueType::Task => "Task",
        };
        f.write_str(name)
    }
}

/// Three-valued health indicator. Ordered by severity: Green < Yellow < Red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorStatus {
    Green,
    Yellow,
    Red,
}

impl FromStr for ColorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(ColorStatus::Green),
            "yellow" | "amber" => Ok(ColorStatus::Yellow),
            "red" => Ok(ColorStatus::Red),
            other => Err(format!("unknown color status '{other}'")),
        }
    }
}

impl fmt::Display for ColorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorStatus::Green => "Green",
            ColorStatus::Yellow => "Yellow",
            ColorStatus::Red => "Red",
        };
        f.write_str(name)
    }
}

/// Jira priority, used as a weighting input when classifying negative language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    /// Maps both the default Jira scheme and the legacy Blocker/Critical/Major/Minor/Trivial one.
    pub fn from_jira_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "highest" | "blocker" | "critical" => Some(Priority::Highest),
            "high" | "major" => Some(Priority::High),
            "medium" | "normal" => Some(Priority::Medium),
            "low" | "minor" => Some(Priority::Low),
            "lowest" | "trivial" => Some(Priority::Lowest),
            _ => None,
        }
    }

    /// Multiplier applied to negative sentiment. Missing priority uses the Medium weight.
    pub fn weight(priority: Option<Priority>) -> f64 {
        match priority {
            Some(Priority::Highest) => 1.5,
            Some(Priority::High) => 1.25,
            Some(Priority::Medium) | None => 1.0,
            Some(Priority::Low) => 0.85,
            Some(Priority::Lowest) => 0.7,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub body: String,
    pub created: DateTime<Utc>,
}

/// A single node of a fetched hierarchy snapshot. Read-only input to the roll-up.
///
/// Children are not supplied by callers; they are derived from `parent_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(alias = "type", alias = "issueType")]
    pub issue_type: IssueType,
    #[serde(default, alias = "parentKey")]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, alias = "rawStatusSummary")]
    pub raw_status_summary: Option<String>,
    #[serde(default, alias = "rawColorStatus")]
    pub raw_color_status: Option<ColorStatus>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Issue {
    /// The pre-existing status summary, if it carries any non-whitespace text.
    pub fn raw_summary(&self) -> Option<&str> {
        self.raw_status_summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{ColorStatus, Comment, Issue, IssueType};

    /// Fixed reference instant so recency weighting is reproducible in tests.
    pub fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap()
    }

    pub fn issue(key: &str, parent: Option<&str>) -> Issue {
        Issue {
            key: key.to_string(),
            issue_type: if parent.is_none() {
                IssueType::Epic
            } else {
                IssueType::Story
            },
            parent_key: parent.map(str::to_string),
            summary: format!("Work item {key}"),
            description: None,
            comments: vec![],
            status: "In Progress".to_string(),
            priority: None,
            raw_status_summary: None,
            raw_color_status: None,
            created_at: as_of() - Duration::days(30),
        }
    }

    pub fn with_comment(mut issue: Issue, body: &str, days_ago: i64) -> Issue {
        issue.comments.push(Comment {
            body: body.to_string(),
            created: as_of() - Duration::days(days_ago),
        });
        issue
    }

    pub fn with_raw_color(mut issue: Issue, color: ColorStatus) -> Issue {
        issue.raw_color_status = Some(color);
        issue
    }

    pub fn with_raw_summary(mut issue: Issue, summary: &str) -> Issue {
        issue.raw_status_summary = Some(summary.to_string());
        issue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_status_orders_by_severity() {
        assert!(ColorStatus::Green < ColorStatus::Yellow);
        assert!(ColorStatus::Yellow < ColorStatus::Red);
        assert_eq!(
            [ColorStatus::Yellow, ColorStatus::Red, ColorStatus::Green]
                .into_iter()
                .max(),
            Some(ColorStatus::Red)
        );
    }

    #[test]
    fn test_issue_type_from_jira_name() {
        assert_eq!(IssueType::from_jira_name("Epic"), IssueType::Epic);
        assert_eq!(IssueType::from_jira_name("initiative"), IssueType::Initiative);
        assert_eq!(IssueType::from_jira_name("Sub-task"), IssueType::Task);
        assert_eq!(IssueType::from_jira_name("Bug"), IssueType::Task);
    }

    #[test]
    fn test_priority_legacy_names() {
        assert_eq!(Priority::from_jira_name("Blocker"), Some(Priority::Highest));
        assert_eq!(Priority::from_jira_name("Minor"), Some(Priority::Low));
        assert_eq!(Priority::from_jira_name("P9"), None);
    }

    #[test]
    fn test_missing_priority_uses_medium_weight() {
        assert_eq!(Priority::weight(None), Priority::weight(Some(Priority::Medium)));
        assert!(Priority::weight(Some(Priority::Highest)) > 1.0);
    }

    #[test]
    fn test_blank_raw_summary_counts_as_absent() {
        let mut issue = fixtures::issue("PULSE-1", None);
        issue.raw_status_summary = Some("   \n".to_string());
        assert!(issue.raw_summary().is_none());

        issue.raw_status_summary = Some("  On track for beta.  ".to_string());
        assert_eq!(issue.raw_summary(), Some("On track for beta."));
    }

    #[test]
    fn test_issue_deserializes_camel_case_aliases() {
        let json = r#"{
            "key": "OPS-12",
            "type": "Feature",
            "parentKey": "OPS-1",
            "summary": "Rate limiting",
            "status": "In Progress",
            "priority": "High",
            "rawColorStatus": "Red",
            "createdAt": "2025-08-01T09:30:00Z"
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.issue_type, IssueType::Feature);
        assert_eq!(issue.parent_key.as_deref(), Some("OPS-1"));
        assert_eq!(issue.raw_color_status, Some(ColorStatus::Red));
        assert_eq!(issue.priority, Some(Priority::High));
        assert!(issue.comments.is_empty());
    }
}
