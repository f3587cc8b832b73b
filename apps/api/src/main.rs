mod config;
mod errors;
mod jira;
mod models;
mod report;
mod rollup;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::jira::fetcher::{IssueFetcher, JiraIssueFetcher};
use crate::jira::JiraClient;
use crate::rollup::engine::RollupEngine;
use crate::rollup::scoring::RollupSettings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable values or partial Jira credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pulse API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize roll-up engine (LexiconAnalyzer by default)
    let settings = RollupSettings {
        recency_half_life_days: config.recency_half_life_days,
        ..RollupSettings::default()
    };
    let engine = Arc::new(RollupEngine::lexicon(settings));
    info!(
        "Roll-up engine initialized (backend: {}, half-life: {} days)",
        engine.backend(),
        engine.settings().recency_half_life_days
    );

    // Initialize Jira fetcher when credentials are present
    let fetcher: Option<Arc<dyn IssueFetcher>> = match &config.jira {
        Some(jira) => {
            let client = JiraClient::new(jira).context("Failed to build Jira HTTP client")?;
            info!("Jira client initialized ({}, API v{})", jira.base_url, jira.api_version);
            Some(Arc::new(JiraIssueFetcher::new(client, jira.fields.clone())))
        }
        None => {
            warn!("Jira not configured; hierarchy reports are disabled");
            None
        }
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        engine,
        fetcher,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
