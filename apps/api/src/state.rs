use std::sync::Arc;

use crate::config::Config;
use crate::planning::advisor::PlanningAdvisor;
use crate::providers::ProviderRegistry;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    /// Gemini-backed when `GEMINI_API_KEY` is set, keyword heuristics otherwise.
    pub advisor: Arc<dyn PlanningAdvisor>,
    pub providers: ProviderRegistry,
    pub config: Config,
}
