use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::issue::{ColorStatus, Priority};

/// Relative weight of each kind of narrative segment in a computed summary's signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentWeights {
    pub description: f64,
    /// Multiplied by the comment's recency decay.
    pub comment: f64,
    /// Split evenly across children that have a narrative.
    pub children: f64,
}

impl Default for SegmentWeights {
    fn default() -> Self {
        Self {
            description: 0.2,
            comment: 0.4,
            children: 0.2,
        }
    }
}

/// Tunables for one roll-up run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupSettings {
    pub recency_half_life_days: f64,
    /// Most recent comments quoted in a computed summary and scored for its signal.
    pub max_comments: usize,
    pub excerpt_chars: usize,
    pub child_excerpt_chars: usize,
    pub weights: SegmentWeights,
    /// Adjusted score at or below this is Red.
    pub red_threshold: f64,
    /// Adjusted score at or below this is Yellow.
    pub yellow_threshold: f64,
    pub in_progress_amplifier: f64,
    pub risk_penalty: f64,
}

impl Default for RollupSettings {
    fn default() -> Self {
        Self {
            recency_half_life_days: 7.0,
            max_comments: 3,
            excerpt_chars: 240,
            child_excerpt_chars: 160,
            weights: SegmentWeights::default(),
            red_threshold: -0.5,
            yellow_threshold: -0.05,
            in_progress_amplifier: 1.25,
            risk_penalty: 0.15,
        }
    }
}

/// Recency weight with exponential half-life decay.
/// Returns 1.0 for anything at or after `as_of`.
pub fn compute_recency_weight(
    created: DateTime<Utc>,
    as_of: DateTime<Utc>,
    half_life_days: f64,
) -> f64 {
    let age_days = (as_of - created).num_seconds() as f64 / 86_400.0;
    if age_days <= 0.0 || half_life_days <= 0.0 {
        return 1.0;
    }
    (0.5_f64).powf(age_days / half_life_days).clamp(0.0, 1.0)
}

/// Weighted mean of `(score, weight)` pairs. Zero total weight yields 0.0.
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let (sum, total) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(sum, total), (score, weight)| {
            (sum + score * weight, total + weight)
        });
    if total > 0.0 {
        (sum / total).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

const IN_PROGRESS_STATES: &[&str] = &["in progress", "in review", "in development", "in testing"];

pub fn is_in_progress(status: &str) -> bool {
    let status = status.trim().to_ascii_lowercase();
    IN_PROGRESS_STATES.contains(&status.as_str())
}

/// Applies priority and workflow weighting to a compound score.
///
/// Only negative language is amplified; a risk marker pulls a score that is not
/// clearly positive further down.
pub fn adjust_compound(
    compound: f64,
    risk: bool,
    priority: Option<Priority>,
    status: &str,
    settings: &RollupSettings,
) -> f64 {
    let mut amplification = Priority::weight(priority);
    if is_in_progress(status) {
        amplification *= settings.in_progress_amplifier;
    }

    let mut adjusted = if compound < 0.0 {
        compound * amplification
    } else {
        compound
    };
    if risk && compound <= settings.yellow_threshold.abs() {
        adjusted -= settings.risk_penalty * amplification;
    }
    adjusted.clamp(-1.0, 1.0)
}

pub fn classify(adjusted: f64, settings: &RollupSettings) -> ColorStatus {
    if adjusted <= settings.red_threshold {
        ColorStatus::Red
    } else if adjusted <= settings.yellow_threshold {
        ColorStatus::Yellow
    } else {
        ColorStatus::Green
    }
}
