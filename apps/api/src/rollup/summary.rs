//! Computed status summaries: a deterministic narrative assembled from an
//! issue's own text and its children's already-selected summaries.

use chrono::{DateTime, Utc};

use crate::models::issue::Issue;
use crate::rollup::scoring::{compute_recency_weight, RollupSettings};

/// Marker used in place of a summary when there is nothing to summarize.
pub const INSUFFICIENT_DATA: &str =
    "Insufficient data: no description, recent comments, or child updates to summarize.";

/// One scored piece of narrative evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedSummary {
    pub text: String,
    pub segments: Vec<Segment>,
    pub insufficient_data: bool,
}

/// A finalized child's contribution to its parent's narrative.
#[derive(Debug, Clone, Copy)]
pub struct ChildNarrative<'a> {
    pub key: &'a str,
    pub title: &'a str,
    pub summary: &'a str,
    pub insufficient_data: bool,
}

/// Builds the computed summary for an issue that has no raw status summary.
///
/// Layout: title, newest comment first (up to `max_comments`), description
/// excerpt, then child updates in roll-up order. The title never counts as
/// narrative evidence on its own.
pub fn compose_summary(
    issue: &Issue,
    children: &[ChildNarrative<'_>],
    as_of: DateTime<Utc>,
    settings: &RollupSettings,
) -> ComputedSummary {
    let mut segments = Vec::new();
    let mut parts = Vec::new();

    let mut comments: Vec<_> = issue
        .comments
        .iter()
        .filter(|c| !c.body.trim().is_empty())
        .collect();
    // Newest first; stable sort keeps input order for identical timestamps.
    comments.sort_by(|a, b| b.created.cmp(&a.created));

    for (idx, comment) in comments.iter().take(settings.max_comments).enumerate() {
        let text = excerpt(&comment.body, settings.excerpt_chars);
        let label = if idx == 0 { "Latest update" } else { "Earlier" };
        parts.push(format!(
            "{label} ({}): {}",
            comment.created.format("%Y-%m-%d"),
            terminate(&text)
        ));
        segments.push(Segment {
            text,
            weight: settings.weights.comment
                * compute_recency_weight(
                    comment.created,
                    as_of,
                    settings.recency_half_life_days,
                ),
        });
    }

    if let Some(description) = issue.description_text() {
        let text = excerpt(description, settings.excerpt_chars);
        parts.push(format!("Context: {}", terminate(&text)));
        segments.push(Segment {
            text,
            weight: settings.weights.description,
        });
    }

    let (reporting, silent): (Vec<&ChildNarrative<'_>>, Vec<&ChildNarrative<'_>>) =
        children.iter().partition(|c| !c.insufficient_data);
    if !reporting.is_empty() {
        let share = settings.weights.children / reporting.len() as f64;
        let mut updates = Vec::with_capacity(reporting.len());
        for child in &reporting {
            let body = strip_title(child.summary, child.title);
            let text = excerpt(first_sentence(body), settings.child_excerpt_chars);
            updates.push(format!("{}: {}", child.key, terminate(&text)));
            segments.push(Segment {
                text,
                weight: share,
            });
        }
        parts.push(format!("Child updates: {}", updates.join(" ")));
    }

    if segments.is_empty() {
        return ComputedSummary {
            text: INSUFFICIENT_DATA.to_string(),
            segments,
            insufficient_data: true,
        };
    }

    if !silent.is_empty() {
        parts.push(format!(
            "{} child issue(s) without updates.",
            silent.len()
        ));
    }

    let title = issue.summary.trim();
    let text = if title.is_empty() {
        parts.join(" ")
    } else {
        format!("{} {}", terminate(title), parts.join(" "))
    };

    ComputedSummary {
        text,
        segments,
        insufficient_data: false,
    }
}

/// Collapses whitespace and truncates on a word boundary, appending "..." when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation()))
}

/// Text up to and including the first sentence terminator followed by whitespace.
pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    let bytes = text.as_bytes();
    for (idx, &b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?')
            && bytes.get(idx + 1).map_or(true, |n| n.is_ascii_whitespace())
        {
            return &text[..=idx];
        }
    }
    text
}

/// Drops the leading title sentence a computed summary starts with.
pub(crate) fn strip_title<'a>(summary: &'a str, title: &str) -> &'a str {
    let title = title.trim();
    if title.is_empty() {
        return summary;
    }
    summary
        .strip_prefix(terminate(title).as_str())
        .map(str::trim_start)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(summary)
}

fn terminate(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::fixtures::{as_of, issue, with_comment};

    #[test]
    fn test_leaf_without_narrative_is_insufficient() {
        let leaf = issue("OPS-2", Some("OPS-1"));
        let summary = compose_summary(&leaf, &[], as_of(), &RollupSettings::default());
        assert!(summary.insufficient_data);
        assert_eq!(summary.text, INSUFFICIENT_DATA);
        assert!(summary.segments.is_empty());
    }

    #[test]
    fn test_whitespace_comments_do_not_count() {
        let leaf = with_comment(issue("OPS-2", Some("OPS-1")), "   ", 1);
        let summary = compose_summary(&leaf, &[], as_of(), &RollupSettings::default());
        assert!(summary.insufficient_data);
    }

    #[test]
    fn test_newest_comment_leads_and_limit_applies() {
        let mut leaf = issue("OPS-2", Some("OPS-1"));
        leaf = with_comment(leaf, "Kickoff held", 6);
        leaf = with_comment(leaf, "Schema merged", 1);
        leaf = with_comment(leaf, "Load test scheduled", 3);
        leaf = with_comment(leaf, "Ancient history", 20);

        let summary = compose_summary(&leaf, &[], as_of(), &RollupSettings::default());
        assert!(!summary.insufficient_data);
        assert_eq!(summary.segments.len(), 3);
        assert_eq!(summary.segments[0].text, "Schema merged");
        assert!(summary.text.starts_with("Work item OPS-2. Latest update (2025-09-09): Schema merged."));
        assert!(!summary.text.contains("Ancient history"));
        // Newer comments weigh more
        assert!(summary.segments[0].weight > summary.segments[1].weight);
    }

    #[test]
    fn test_child_narratives_are_included_and_weighted_evenly() {
        let parent = issue("OPS-1", None);
        let children = [
            ChildNarrative {
                key: "OPS-2",
                title: "Rollout",
                summary: "Rollout finished. Monitoring continues.",
                insufficient_data: false,
            },
            ChildNarrative {
                key: "OPS-3",
                title: "Vendor onboarding",
                summary: "Blocked on vendor.",
                insufficient_data: false,
            },
            ChildNarrative {
                key: "OPS-4",
                title: "Docs",
                summary: INSUFFICIENT_DATA,
                insufficient_data: true,
            },
        ];
        let summary = compose_summary(&parent, &children, as_of(), &RollupSettings::default());
        assert!(summary
            .text
            .contains("Child updates: OPS-2: Rollout finished. OPS-3: Blocked on vendor."));
        assert!(summary.text.ends_with("1 child issue(s) without updates."));
        assert_eq!(summary.segments.len(), 2);
        assert!((summary.segments[0].weight - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_only_silent_children_is_insufficient() {
        let parent = issue("OPS-1", None);
        let children = [ChildNarrative {
            key: "OPS-2",
            title: "Docs",
            summary: INSUFFICIENT_DATA,
            insufficient_data: true,
        }];
        let summary = compose_summary(&parent, &children, as_of(), &RollupSettings::default());
        assert!(summary.insufficient_data);
    }

    #[test]
    fn test_description_alone_is_enough() {
        let mut leaf = issue("OPS-2", Some("OPS-1"));
        leaf.description = Some("Migrate   billing\n to the new ledger".to_string());
        let summary = compose_summary(&leaf, &[], as_of(), &RollupSettings::default());
        assert!(!summary.insufficient_data);
        assert!(summary.text.contains("Context: Migrate billing to the new ledger."));
    }

    #[test]
    fn test_child_title_is_not_quoted_as_its_update() {
        let parent = issue("OPS-1", None);
        let children = [ChildNarrative {
            key: "OPS-2",
            title: "Billing migration",
            summary: "Billing migration. Latest update (2025-09-09): Cutover slipped a week.",
            insufficient_data: false,
        }];
        let summary = compose_summary(&parent, &children, as_of(), &RollupSettings::default());
        assert!(summary
            .text
            .contains("OPS-2: Latest update (2025-09-09): Cutover slipped a week."));
    }

    #[test]
    fn test_excerpt_truncates_on_word_boundary() {
        assert_eq!(excerpt("short text", 50), "short text");
        assert_eq!(excerpt("alpha beta gamma delta", 12), "alpha beta...");
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("Done. Next up: docs."), "Done.");
        assert_eq!(first_sentence("v1.2 shipped"), "v1.2 shipped");
        assert_eq!(first_sentence("  Really?  Yes. "), "Really?");
    }
}
