//! Roll-Up Engine: annotates a validated hierarchy in a single post-order pass.
//!
//! Flow: build hierarchy → for each issue, children first:
//!       select summary (raw, else computed) → score signal →
//!       select color (raw, else own signal rolled up over children).
//!
//! The two preference rules are independent: a raw color never implies a raw
//! summary and vice versa. The engine never reads the clock; `as_of` is input.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::issue::{ColorStatus, Issue};
use crate::models::rollup::{AnnotatedIssue, Rollup, ValueSource};
use crate::rollup::color::{computed_signal, raw_signal, roll_up, signal_color};
use crate::rollup::hierarchy::Hierarchy;
use crate::rollup::scoring::RollupSettings;
use crate::rollup::sentiment::{LexiconAnalyzer, TextAnalyzer};
use crate::rollup::summary::{compose_summary, ChildNarrative};
use crate::rollup::RollupError;

/// Stateless between runs; safe to share behind an `Arc`.
#[derive(Clone)]
pub struct RollupEngine {
    analyzer: Arc<dyn TextAnalyzer>,
    settings: RollupSettings,
}

impl RollupEngine {
    pub fn new(analyzer: Arc<dyn TextAnalyzer>, settings: RollupSettings) -> Self {
        Self { analyzer, settings }
    }

    /// Lexicon analyzer with the given settings.
    pub fn lexicon(settings: RollupSettings) -> Self {
        Self::new(Arc::new(LexiconAnalyzer), settings)
    }

    #[cfg(test)]
    pub fn with_defaults() -> Self {
        Self::lexicon(RollupSettings::default())
    }

    pub fn settings(&self) -> &RollupSettings {
        &self.settings
    }

    pub fn backend(&self) -> &'static str {
        self.analyzer.backend()
    }

    /// Annotates every issue of `issues`. Fails before producing any output when
    /// the set is not a single rooted tree.
    pub fn run(&self, issues: &[Issue], as_of: DateTime<Utc>) -> Result<Rollup, RollupError> {
        let hierarchy = Hierarchy::build(issues)?;
        let depths = hierarchy.depths();
        let order = hierarchy.post_order();

        let mut annotated: Vec<AnnotatedIssue> = Vec::with_capacity(order.len());
        let mut position: HashMap<&str, usize> = HashMap::with_capacity(order.len());

        for key in order {
            let Some(issue) = hierarchy.issue(key) else {
                continue;
            };
            let child_keys = hierarchy.children_of(key);
            let finalized: Vec<&AnnotatedIssue> = child_keys
                .iter()
                .filter_map(|c| position.get(c).map(|&idx| &annotated[idx]))
                .collect();

            let (selected_summary, summary_source, computed_summary, signal) =
                match issue.raw_summary() {
                    Some(raw) => (
                        raw.to_string(),
                        ValueSource::Raw,
                        None,
                        raw_signal(raw, self.analyzer.as_ref()),
                    ),
                    None => {
                        let narratives: Vec<ChildNarrative<'_>> = finalized
                            .iter()
                            .map(|child| ChildNarrative {
                                key: &child.issue.key,
                                title: &child.issue.summary,
                                summary: &child.selected_status_summary,
                                insufficient_data: child.signal.insufficient_data,
                            })
                            .collect();
                        let composed = compose_summary(issue, &narratives, as_of, &self.settings);
                        let signal = computed_signal(&composed, self.analyzer.as_ref());
                        (
                            composed.text.clone(),
                            ValueSource::Computed,
                            Some(composed.text),
                            signal,
                        )
                    }
                };

            let (selected_color, color_source, computed_color) = match issue.raw_color_status {
                Some(raw) => (raw, ValueSource::Raw, None),
                None => {
                    let own = signal_color(&signal, issue, &self.settings);
                    let child_colors: Vec<ColorStatus> = finalized
                        .iter()
                        .map(|child| child.selected_color_status)
                        .collect();
                    let color = roll_up(own, &child_colors);
                    (color, ValueSource::Computed, Some(color))
                }
            };

            debug!(
                "{key}: summary={} color={selected_color} ({}) compound={:.3}",
                summary_source.as_str(),
                color_source.as_str(),
                signal.compound
            );

            position.insert(key, annotated.len());
            annotated.push(AnnotatedIssue {
                issue: issue.clone(),
                children: child_keys.iter().map(|c| c.to_string()).collect(),
                depth: depths.get(key).copied().unwrap_or_default(),
                computed_status_summary: computed_summary,
                selected_status_summary: selected_summary,
                summary_source,
                computed_color_status: computed_color,
                selected_color_status: selected_color,
                color_source,
                signal,
            });
        }

        let root_key = hierarchy.root().to_string();
        if let Some(root) = annotated.last() {
            info!(
                "Rolled up {} issues under {root_key}: root is {} ({})",
                annotated.len(),
                root.selected_color_status,
                root.color_source.as_str()
            );
        }

        Ok(Rollup {
            root_key,
            as_of,
            issues: annotated,
        })
    }
}
