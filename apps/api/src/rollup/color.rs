//! Issue signals and color selection.
//!
//! An issue's own color comes from its signal (sentiment plus risk markers,
//! weighted by priority and workflow state). The roll-up then lets the worst
//! child dominate: any Yellow or Red child lifts the parent to at least Yellow.

use crate::models::issue::{ColorStatus, Issue};
use crate::models::rollup::IssueSignal;
use crate::rollup::scoring::{adjust_compound, classify, weighted_mean, RollupSettings};
use crate::rollup::sentiment::{detect_markers, TextAnalyzer};
use crate::rollup::summary::ComputedSummary;

/// Signal for a pre-existing summary, scored as a single segment.
pub fn raw_signal(text: &str, analyzer: &dyn TextAnalyzer) -> IssueSignal {
    let markers = detect_markers(text);
    IssueSignal {
        compound: analyzer.polarity(text),
        risk: markers.risk,
        positive: markers.positive,
        insufficient_data: false,
    }
}

/// Signal for a computed summary: weighted mean polarity over its segments.
pub fn computed_signal(summary: &ComputedSummary, analyzer: &dyn TextAnalyzer) -> IssueSignal {
    if summary.insufficient_data {
        return IssueSignal {
            compound: 0.0,
            risk: false,
            positive: false,
            insufficient_data: true,
        };
    }

    let compound = weighted_mean(
        summary
            .segments
            .iter()
            .map(|s| (analyzer.polarity(&s.text), s.weight)),
    );
    let (risk, positive) = summary
        .segments
        .iter()
        .map(|s| detect_markers(&s.text))
        .fold((false, false), |(risk, positive), m| {
            (risk || m.risk, positive || m.positive)
        });

    IssueSignal {
        compound,
        risk,
        positive,
        insufficient_data: false,
    }
}

/// The issue's own color, before children are considered.
/// Insufficient data is Yellow, never silently Green.
pub fn signal_color(signal: &IssueSignal, issue: &Issue, settings: &RollupSettings) -> ColorStatus {
    if signal.insufficient_data {
        return ColorStatus::Yellow;
    }
    let adjusted = adjust_compound(
        signal.compound,
        signal.risk,
        issue.priority,
        &issue.status,
        settings,
    );
    classify(adjusted, settings)
}

/// Worst-case-dominant roll-up of an own color over the children's selected colors.
pub fn roll_up(own: ColorStatus, children: &[ColorStatus]) -> ColorStatus {
    let worst_child = children.iter().copied().max();
    match worst_child {
        Some(ColorStatus::Yellow | ColorStatus::Red) => own.max(ColorStatus::Yellow),
        Some(ColorStatus::Green) | None => own,
    }
}
