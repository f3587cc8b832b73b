use std::sync::Arc;

use crate::config::Config;
use crate::jira::fetcher::IssueFetcher;
use crate::rollup::engine::RollupEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<RollupEngine>,
    /// Pluggable snapshot source. Default: JiraIssueFetcher; `None` without Jira credentials.
    pub fetcher: Option<Arc<dyn IssueFetcher>>,
}
