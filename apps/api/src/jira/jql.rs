//! JQL construction for hierarchy traversal.

use crate::models::issue::IssueType;

/// How descendants of a root are found, chosen by the root's issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalPattern {
    /// Outcome, Initiative and Feature roots: every portfolio descendant.
    PortfolioDescendants,
    /// Epic roots: issues linked to the epic, or parented by it.
    EpicChildren,
    /// Story and Task roots: direct children only.
    DirectChildren,
}

impl TraversalPattern {
    pub fn for_root(issue_type: IssueType) -> Self {
        match issue_type {
            IssueType::Outcome | IssueType::Initiative | IssueType::Feature => {
                TraversalPattern::PortfolioDescendants
            }
            IssueType::Epic => TraversalPattern::EpicChildren,
            IssueType::Story | IssueType::Task => TraversalPattern::DirectChildren,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalPattern::PortfolioDescendants => "portfolio_descendants",
            TraversalPattern::EpicChildren => "epic_children",
            TraversalPattern::DirectChildren => "direct_children",
        }
    }

    /// Descendant query restricted to in-progress work, oldest first.
    /// `epic_link_field` is the discovered Epic Link custom field ID, if any.
    pub fn descendants_jql(&self, root_key: &str, epic_link_field: Option<&str>) -> String {
        let scope = match self {
            TraversalPattern::PortfolioDescendants => {
                format!("issuekey in portfolioChildIssuesOf(\"{root_key}\")")
            }
            TraversalPattern::EpicChildren => {
                let epic = epic_link_field
                    .map(field_clause)
                    .unwrap_or_else(|| "\"Epic Link\"".to_string());
                format!("({epic} = \"{root_key}\" OR parent = \"{root_key}\")")
            }
            TraversalPattern::DirectChildren => format!("parent = \"{root_key}\""),
        };
        format!("{scope} AND statusCategory = \"In Progress\" ORDER BY created ASC")
    }
}

/// JQL reference for a custom field ID: `customfield_10014` becomes `cf[10014]`.
pub fn field_clause(field_id: &str) -> String {
    match field_id.strip_prefix("customfield_") {
        Some(number) => format!("cf[{number}]"),
        None => format!("\"{field_id}\""),
    }
}

/// `PROJECT-123` shape: uppercase letter first, then uppercase letters, digits or
/// underscores, a dash, and a numeric suffix. Guards JQL interpolation.
pub fn is_valid_issue_key(key: &str) -> bool {
    let Some((project, number)) = key.split_once('-') else {
        return false;
    };
    let mut chars = project.chars();
    let leading = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    leading
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}
