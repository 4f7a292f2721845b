mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod planning;
mod providers;
mod routes;
mod search;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::planning::advisor::{KeywordAdvisor, LlmPlanningAdvisor, PlanningAdvisor};
use crate::providers::ProviderRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgJobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobscout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Planning advisor: Gemini when configured, keyword heuristics otherwise
    let advisor: Arc<dyn PlanningAdvisor> = match &config.gemini_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.gemini_model.clone())
                .context("Failed to build Gemini client")?;
            info!("LLM planning advisor initialized (model: {})", llm.model());
            Arc::new(LlmPlanningAdvisor::new(llm))
        }
        None => {
            warn!("GEMINI_API_KEY not set; using keyword planning advisor");
            Arc::new(KeywordAdvisor)
        }
    };

    let providers = ProviderRegistry::from_config(&config)?;
    info!(
        "Search budget ${:.2} per session, deadline {}s",
        config.search.budget_ceiling, config.search.deadline_secs
    );

    // Build app state
    let state = AppState {
        store: Arc::new(PgJobStore::new(db)),
        advisor,
        providers,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
