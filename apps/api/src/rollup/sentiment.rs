//! Sentiment scoring: pluggable, trait-based text analyzer used to derive an
//! issue's own status signal.
//!
//! Default: `LexiconAnalyzer` (pure-Rust, deterministic, fully testable).
//! The engine holds an `Arc<dyn TextAnalyzer>`, so a different backend can be
//! swapped in without touching the roll-up.

use serde::Serialize;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Maps free text onto a compound polarity in [-1, 1].
/// Implementations must be pure: the same text always yields the same score.
pub trait TextAnalyzer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;

    /// Short label reported alongside results, for transparency.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// LexiconAnalyzer
// ────────────────────────────────────────────────────────────────────────────

/// Valence-lexicon analyzer tuned for engineering status updates.
///
/// Algorithm:
/// 1. Lowercase, tokenize on anything that is not alphanumeric or an apostrophe
/// 2. Match multi-word phrases first ("on track", "behind schedule"), then single words
/// 3. A preceding intensifier adds 0.293 to the magnitude
/// 4. A negation within the three preceding tokens flips and damps the valence (x -0.74)
/// 5. Around the last "but", earlier valences are halved and later ones scaled by 1.5
/// 6. compound = sum / sqrt(sum² + 15)
pub struct LexiconAnalyzer;

const NORMALIZATION_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const INTENSIFIER_BOOST: f64 = 0.293;
const NEGATION_WINDOW: usize = 3;

/// Sorted by word for binary search.
const WORDS: &[(&str, f64)] = &[
    ("achieved", 2.0),
    ("ahead", 1.2),
    ("approved", 1.8),
    ("bad", -2.5),
    ("blocked", -2.2),
    ("blocker", -2.2),
    ("blockers", -2.2),
    ("blocking", -2.0),
    ("broken", -2.1),
    ("bug", -1.2),
    ("bugs", -1.2),
    ("cancelled", -1.6),
    ("complete", 1.3),
    ("completed", 1.6),
    ("concern", -1.4),
    ("concerned", -1.6),
    ("concerns", -1.4),
    ("confident", 2.2),
    ("critical", -1.5),
    ("delay", -1.8),
    ("delayed", -1.9),
    ("delays", -1.8),
    ("delivered", 1.8),
    ("difficult", -1.5),
    ("done", 1.2),
    ("escalated", -1.6),
    ("escalation", -1.6),
    ("excellent", 3.2),
    ("failed", -2.3),
    ("failing", -2.3),
    ("failure", -2.5),
    ("fixed", 1.4),
    ("good", 1.9),
    ("great", 3.1),
    ("green", 1.0),
    ("happy", 2.7),
    ("healthy", 1.8),
    ("impediment", -1.8),
    ("improved", 1.9),
    ("landed", 1.6),
    ("late", -1.4),
    ("merged", 1.3),
    ("missed", -1.7),
    ("outage", -2.5),
    ("overdue", -2.0),
    ("pleased", 1.9),
    ("poor", -2.1),
    ("postponed", -1.5),
    ("problem", -1.7),
    ("problems", -1.7),
    ("progress", 1.2),
    ("progressing", 1.2),
    ("promising", 1.7),
    ("ready", 1.0),
    ("red", -1.0),
    ("regression", -2.0),
    ("regressions", -2.0),
    ("released", 1.5),
    ("resolved", 1.6),
    ("risk", -1.6),
    ("risks", -1.6),
    ("risky", -1.8),
    ("severe", -2.2),
    ("shipped", 1.8),
    ("slip", -1.7),
    ("slipped", -1.9),
    ("slipping", -1.9),
    ("smooth", 1.6),
    ("smoothly", 1.6),
    ("stable", 1.5),
    ("started", 0.6),
    ("struggling", -2.0),
    ("stuck", -2.0),
    ("success", 2.7),
    ("successful", 2.8),
    ("successfully", 2.6),
    ("unblocked", 1.8),
    ("uncertain", -1.2),
    ("unclear", -1.0),
    ("waiting", -0.8),
    ("well", 1.1),
    ("worse", -2.1),
    ("worst", -3.1),
];

const PHRASES: &[(&[&str], f64)] = &[
    (&["ahead", "of", "schedule"], 2.0),
    (&["at", "risk"], -2.0),
    (&["behind", "schedule"], -2.0),
    (&["off", "track"], -2.2),
    (&["on", "schedule"], 1.8),
    (&["on", "track"], 2.0),
    (&["pushed", "back"], -1.5),
    (&["pushed", "out"], -1.5),
    (&["won't", "meet"], -2.0),
    (&["work", "has", "started"], 1.0),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "without", "cannot",
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "highly",
    "significantly",
    "severely",
    "seriously",
    "totally",
    "completely",
];

impl TextAnalyzer for LexiconAnalyzer {
    fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let but_at = tokens.iter().rposition(|t| t == "but");
        let mut sum = 0.0;
        let mut i = 0;

        while i < tokens.len() {
            let Some((valence, width)) = match_phrase(&tokens[i..]).or_else(|| {
                lookup_word(&tokens[i]).map(|v| (v, 1))
            }) else {
                i += 1;
                continue;
            };

            let mut v = valence;
            if i > 0 && INTENSIFIERS.contains(&tokens[i - 1].as_str()) {
                v += INTENSIFIER_BOOST * v.signum();
            }
            if tokens[i.saturating_sub(NEGATION_WINDOW)..i]
                .iter()
                .any(|t| is_negation(t))
            {
                v *= NEGATION_SCALAR;
            }
            if let Some(b) = but_at {
                if i < b {
                    v *= 0.5;
                } else if i > b {
                    v *= 1.5;
                }
            }

            sum += v;
            i += width;
        }

        normalize(sum)
    }

    fn backend(&self) -> &'static str {
        "lexicon"
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn match_phrase(tokens: &[String]) -> Option<(f64, usize)> {
    PHRASES.iter().find_map(|(words, valence)| {
        let matches = words.len() <= tokens.len()
            && words.iter().zip(tokens).all(|(w, t)| *w == t.as_str());
        matches.then_some((*valence, words.len()))
    })
}

fn lookup_word(token: &str) -> Option<f64> {
    WORDS
        .binary_search_by(|(word, _)| word.cmp(&token))
        .ok()
        .map(|idx| WORDS[idx].1)
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

fn normalize(sum: f64) -> f64 {
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Markers and labels
// ────────────────────────────────────────────────────────────────────────────

/// Whole-word markers of explicit risk language.
const RISK_MARKERS: &[&str] = &[
    "at risk",
    "behind schedule",
    "blocked",
    "blocker",
    "blockers",
    "blocking",
    "concern",
    "concerns",
    "delay",
    "delayed",
    "delays",
    "escalated",
    "escalation",
    "overdue",
    "problem",
    "problems",
    "pushed back",
    "pushed out",
    "qa issue",
    "qe issue",
    "regression",
    "regressions",
    "risk",
    "risks",
    "risky",
    "slip",
    "slipped",
    "slipping",
    "won't meet",
];

/// Whole-word markers of forward momentum.
const POSITIVE_MARKERS: &[&str] = &[
    "completed",
    "delivered",
    "done",
    "good",
    "green",
    "improved",
    "landed",
    "merged",
    "on track",
    "progress",
    "resolved",
    "shipped",
    "started",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    pub risk: bool,
    pub positive: bool,
}

/// Detects risk and positive markers as whole words or phrases.
pub fn detect_markers(text: &str) -> Markers {
    let padded = format!(" {} ", tokenize(text).join(" "));
    let found = |markers: &[&str]| markers.iter().any(|m| padded.contains(&format!(" {m} ")));
    Markers {
        risk: found(RISK_MARKERS),
        positive: found(POSITIVE_MARKERS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_compound(compound: f64) -> Self {
        if compound > 0.05 {
            SentimentLabel::Positive
        } else if compound < -0.05 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
