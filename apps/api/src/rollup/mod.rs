// Status roll-up engine
// Implements: hierarchy validation, post-order summary and color selection,
// lexicon sentiment signals. Pure and synchronous; no I/O happens here.

pub mod color;
pub mod engine;
pub mod handlers;
pub mod hierarchy;
pub mod scoring;
pub mod sentiment;
pub mod summary;

use thiserror::Error;

/// Why an issue set is not a single rooted tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyDefect {
    #[error("no issues supplied")]
    Empty,

    #[error("duplicate issue key {0}")]
    DuplicateKey(String),

    #[error("{child} references missing parent {parent}")]
    DanglingParent { child: String, parent: String },

    #[error("multiple roots: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("parent cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("malformed hierarchy: {0}")]
    MalformedHierarchy(#[from] HierarchyDefect),
}
