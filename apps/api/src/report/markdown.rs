//! Markdown status report: Title, TL;DR, Executive Summary, Supporting Information.

use std::fmt::Write;

use crate::models::issue::ColorStatus;
use crate::models::rollup::{AnnotatedIssue, Rollup};
use crate::rollup::sentiment::SentimentLabel;
use crate::rollup::summary::{excerpt, first_sentence, strip_title};

const WATCH_ITEM_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Overrides the root issue's summary in the heading.
    pub title: Option<String>,
    /// Shown in the header when the snapshot was fetched with a comment window.
    pub lookback_days: Option<u32>,
}

/// Aggregates for the TL;DR section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub risk_markers: usize,
    pub positive_markers: usize,
    pub insufficient_data: usize,
    /// Mean compound over issues that had something to score.
    pub average_compound: f64,
}

impl ReportStats {
    pub fn collect(rollup: &Rollup) -> Self {
        let mut stats = Self::default();
        let mut scored = Vec::new();
        for annotated in &rollup.issues {
            match annotated.selected_color_status {
                ColorStatus::Green => stats.green += 1,
                ColorStatus::Yellow => stats.yellow += 1,
                ColorStatus::Red => stats.red += 1,
            }
            let signal = &annotated.signal;
            stats.risk_markers += usize::from(signal.risk);
            stats.positive_markers += usize::from(signal.positive);
            if signal.insufficient_data {
                stats.insufficient_data += 1;
            } else {
                scored.push(signal.compound);
            }
        }
        if !scored.is_empty() {
            stats.average_compound = scored.iter().sum::<f64>() / scored.len() as f64;
        }
        stats
    }
}

pub fn render_markdown(rollup: &Rollup, options: &ReportOptions) -> String {
    let mut out = String::new();
    let Some(root) = rollup.root() else {
        return out;
    };
    let stats = ReportStats::collect(rollup);
    let ordered = rollup.pre_order();

    // Title
    let title = options
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(root.issue.summary.trim());
    let _ = writeln!(out, "# Status Report: {}: {}", root.issue.key, title);
    let _ = write!(out, "_Report date: {}", rollup.as_of.format("%Y-%m-%d"));
    if let Some(days) = options.lookback_days {
        let _ = write!(out, ". Comments from the last {days} days");
    }
    let _ = writeln!(out, "._\n");

    // TL;DR
    let label = SentimentLabel::from_compound(stats.average_compound);
    let _ = writeln!(out, "## TL;DR");
    let _ = writeln!(
        out,
        "- Overall: **{}** ({})",
        root.selected_color_status,
        root.color_source.as_str()
    );
    let _ = writeln!(
        out,
        "- Distribution: {} Green, {} Yellow, {} Red across {} issues",
        stats.green,
        stats.yellow,
        stats.red,
        rollup.issues.len()
    );
    let _ = writeln!(
        out,
        "- Sentiment: {} (avg {:.2})",
        label.as_str(),
        stats.average_compound
    );
    let _ = writeln!(
        out,
        "- Signals: {} positive, {} risk",
        stats.positive_markers, stats.risk_markers
    );
    let _ = writeln!(
        out,
        "- Insufficient data: {} of {} issues\n",
        stats.insufficient_data,
        rollup.issues.len()
    );

    // Executive Summary
    let _ = writeln!(out, "## Executive Summary");
    let _ = writeln!(out, "{}\n", root.selected_status_summary);
    let watch = watch_items(&ordered, &rollup.root_key);
    if watch.is_empty() {
        let _ = writeln!(out, "No Red or Yellow items below the root.\n");
    } else {
        let _ = writeln!(out, "Watch items:");
        for item in watch {
            let _ = writeln!(
                out,
                "- **{}** {} ({}): {}",
                item.issue.key,
                item.selected_color_status,
                item.color_source.as_str(),
                excerpt(
                    first_sentence(strip_title(&item.selected_status_summary, &item.issue.summary)),
                    WATCH_ITEM_CHARS
                )
            );
        }
        out.push('\n');
    }

    // Supporting Information
    let _ = writeln!(out, "## Supporting Information");
    for item in &ordered {
        let indent = "  ".repeat(item.depth);
        let signal = &item.signal;
        let _ = writeln!(
            out,
            "{indent}- **{}** {} | {} | {} | {} {} | sentiment {} ({:.2}) | signals +{}/-{}",
            item.issue.key,
            item.issue.summary.trim(),
            item.issue.issue_type,
            if item.issue.status.is_empty() { "Unknown" } else { item.issue.status.as_str() },
            item.selected_color_status,
            item.color_source.as_str(),
            SentimentLabel::from_compound(signal.compound).as_str(),
            signal.compound,
            u8::from(signal.positive),
            u8::from(signal.risk),
        );
        if let Some(priority) = item.issue.priority {
            let _ = writeln!(out, "{indent}  - Priority: {priority}");
        }
        let _ = writeln!(
            out,
            "{indent}  - Summary ({}): {}",
            item.summary_source.as_str(),
            item.selected_status_summary
        );
    }

    out
}

/// Non-root Red items, then Yellow, each group in pre-order.
fn watch_items<'a>(ordered: &[&'a AnnotatedIssue], root_key: &str) -> Vec<&'a AnnotatedIssue> {
    let mut items: Vec<&AnnotatedIssue> = ordered
        .iter()
        .copied()
        .filter(|a| a.issue.key != root_key && a.selected_color_status != ColorStatus::Green)
        .collect();
    // Stable: keeps pre-order inside each color
    items.sort_by(|a, b| b.selected_color_status.cmp(&a.selected_color_status));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::fixtures::{as_of, issue, with_comment, with_raw_color};
    use crate::models::issue::Priority;
    use crate::rollup::engine::RollupEngine;

    fn rollup() -> Rollup {
        let mut root = issue("OPS-1", None);
        root.summary = "Billing platform".to_string();
        root.priority = Some(Priority::High);
        let issues = vec![
            root,
            with_comment(
                issue("OPS-2", Some("OPS-1")),
                "Ledger API shipped, everything stable.",
                1,
            ),
            with_raw_color(issue("OPS-3", Some("OPS-1")), ColorStatus::Yellow),
            with_comment(
                issue("OPS-4", Some("OPS-2")),
                "Blocked on vendor contract, cutover delayed.",
                1,
            ),
        ];
        RollupEngine::with_defaults().run(&issues, as_of()).unwrap()
    }

    #[test]
    fn test_sections_appear_in_order() {
        let md = render_markdown(&rollup(), &ReportOptions::default());
        let title = md.find("# Status Report: OPS-1: Billing platform").unwrap();
        let tldr = md.find("## TL;DR").unwrap();
        let exec = md.find("## Executive Summary").unwrap();
        let support = md.find("## Supporting Information").unwrap();
        assert!(title < tldr && tldr < exec && exec < support);
        assert!(md.contains("_Report date: 2025-09-10._"));
    }

    #[test]
    fn test_title_override_and_lookback() {
        let options = ReportOptions {
            title: Some("Q3 Billing".to_string()),
            lookback_days: Some(14),
        };
        let md = render_markdown(&rollup(), &options);
        assert!(md.starts_with("# Status Report: OPS-1: Q3 Billing\n"));
        assert!(md.contains("Comments from the last 14 days._"));
    }

    #[test]
    fn test_watch_items_red_before_yellow() {
        let md = render_markdown(&rollup(), &ReportOptions::default());
        let red = md.find("- **OPS-4** Red (computed)").unwrap();
        let yellow = md.find("- **OPS-3** Yellow (raw)").unwrap();
        assert!(red < yellow);
        assert!(!md.contains("- **OPS-1** Yellow"), "root is not a watch item");
        assert!(md.contains(
            "- **OPS-4** Red (computed): Latest update (2025-09-09): Blocked on vendor contract, cutover delayed."
        ));
    }

    #[test]
    fn test_supporting_information_is_pre_order_and_indented() {
        let md = render_markdown(&rollup(), &ReportOptions::default());
        let support = &md[md.find("## Supporting Information").unwrap()..];
        let lines: Vec<&str> = support
            .lines()
            .filter(|l| l.trim_start().starts_with("- **"))
            .collect();
        assert!(lines[0].starts_with("- **OPS-1** Billing platform | Epic"));
        assert!(lines[1].starts_with("  - **OPS-2**"));
        assert!(lines[2].starts_with("    - **OPS-4**"));
        assert!(lines[3].starts_with("  - **OPS-3**"));
        assert!(support.contains("  - Priority: High"));
    }

    #[test]
    fn test_tldr_counts() {
        let rollup = rollup();
        let stats = ReportStats::collect(&rollup);
        assert_eq!(stats.green + stats.yellow + stats.red, 4);
        assert_eq!(stats.insufficient_data, 1);
        assert!(stats.risk_markers >= 1);

        let md = render_markdown(&rollup, &ReportOptions::default());
        assert!(md.contains("- Insufficient data: 1 of 4 issues"));
        assert!(md.contains(&format!(
            "- Overall: **{}** (computed)",
            rollup.root().unwrap().selected_color_status
        )));
    }

    #[test]
    fn test_all_green_has_no_watch_items() {
        let issues = vec![with_comment(issue("OPS-1", None), "Shipped, stable, on track.", 0)];
        let rollup = RollupEngine::with_defaults().run(&issues, as_of()).unwrap();
        let md = render_markdown(&rollup, &ReportOptions::default());
        assert!(md.contains("No Red or Yellow items below the root."));
    }
}
