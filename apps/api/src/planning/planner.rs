//! Strategy Planner: turns advisor suggestions into an ordered, budget-aware
//! strategy chain per career path. Never calls providers or the cost ledger.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::models::career_path::CareerPath;
use crate::planning::advisor::{AdvisorError, AdvisorRequest, PlanningAdvisor};
use crate::planning::strategy::{SearchStrategy, StrategySuggestion};
use crate::providers::adzuna::ADZUNA_PROVIDER_ID;
use crate::providers::jsearch::JSEARCH_PROVIDER_ID;
use crate::providers::usajobs::USAJOBS_PROVIDER_ID;
use crate::providers::{ProviderCapability, OFFLINE_PROVIDER_ID};

pub const DEFAULT_STRATEGY_LABEL: &str = "cost_ordered_default";

/// Advisor names that map onto a registered provider id.
const PROVIDER_ALIASES: &[(&str, &str)] = &[
    ("rapidapi", JSEARCH_PROVIDER_ID),
    ("indeed", JSEARCH_PROVIDER_ID),
    ("linkedin", JSEARCH_PROVIDER_ID),
    ("federal", USAJOBS_PROVIDER_ID),
    ("government", USAJOBS_PROVIDER_ID),
    ("adzuna_api", ADZUNA_PROVIDER_ID),
];

/// Strategy chains for every path in a session, keyed by career path id.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPlan {
    pub strategies: HashMap<String, Vec<SearchStrategy>>,
    pub advisor: String,
    /// Paths that fell back to the cost-ordered default.
    pub defaulted: Vec<String>,
}

impl SearchPlan {
    pub fn strategies_for(&self, path_id: &str) -> &[SearchStrategy] {
        self.strategies
            .get(path_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `cost_ordered_default` when no path used the advisor's suggestions.
    pub fn label(&self) -> String {
        if !self.strategies.is_empty() && self.defaulted.len() == self.strategies.len() {
            DEFAULT_STRATEGY_LABEL.to_string()
        } else {
            format!("{}_advised", self.advisor)
        }
    }
}

pub struct StrategyPlanner {
    advisor: Arc<dyn PlanningAdvisor>,
}

impl StrategyPlanner {
    pub fn new(advisor: Arc<dyn PlanningAdvisor>) -> Self {
        Self { advisor }
    }

    /// Asks the advisor about every path concurrently, then builds each chain.
    /// Advisor failures, and advisors still running at `deadline`, are
    /// recovered with the default ordering.
    pub async fn plan(
        &self,
        paths: &[CareerPath],
        providers: &[ProviderCapability],
        budget_remaining: f64,
        deadline: Instant,
    ) -> SearchPlan {
        let requests: Vec<AdvisorRequest> = paths
            .iter()
            .map(|path| AdvisorRequest {
                title: path.title.clone(),
                keywords: path.keywords.clone(),
                providers: providers.to_vec(),
            })
            .collect();

        let responses = join_all(requests.iter().map(|r| async move {
            timeout_at(deadline, self.advisor.suggest(r))
                .await
                .unwrap_or_else(|_| {
                    Err(AdvisorError::Unavailable(
                        "session deadline reached while planning".to_string(),
                    ))
                })
        }))
        .await;

        let mut strategies = HashMap::with_capacity(paths.len());
        let mut defaulted = Vec::new();

        for (path, response) in paths.iter().zip(responses) {
            let suggestions = match response {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(
                        "Planning advisor '{}' failed for '{}': {e}; using default ordering",
                        self.advisor.name(),
                        path.title
                    );
                    None
                }
            };

            let (chain, used_default) =
                build_strategies(path, suggestions.as_deref(), providers, budget_remaining);
            if used_default {
                defaulted.push(path.id.clone());
            }
            info!(
                "Planned {} strategies for '{}': {}",
                chain.len(),
                path.title,
                chain
                    .iter()
                    .map(|s| format!("{}:{}", s.provider_id, s.query))
                    .collect::<Vec<_>>()
                    .join(" → ")
            );
            strategies.insert(path.id.clone(), chain);
        }

        SearchPlan {
            strategies,
            advisor: self.advisor.name().to_string(),
            defaulted,
        }
    }
}

/// Builds one path's chain from the advisor's suggestions (`None` when the
/// advisor failed). Returns the chain and whether the default ordering was used.
///
/// The chain is cheapest-first (stable, so advisor rank breaks cost ties),
/// excludes anything costing more than `budget_remaining`, and always ends
/// with the offline fallback.
pub fn build_strategies(
    path: &CareerPath,
    suggestions: Option<&[StrategySuggestion]>,
    providers: &[ProviderCapability],
    budget_remaining: f64,
) -> (Vec<SearchStrategy>, bool) {
    let mut candidates = suggestions
        .map(|s| validate_suggestions(s, providers))
        .unwrap_or_default();
    candidates.retain(|(cap, _)| within_budget(cap, budget_remaining));

    let used_default = candidates.is_empty();
    if used_default {
        if suggestions.is_some() {
            warn!(
                "Advisor returned no usable strategies for '{}'; using default ordering",
                path.title
            );
        }
        candidates = default_candidates(path, providers);
        candidates.retain(|(cap, _)| within_budget(cap, budget_remaining));
    } else {
        candidates.sort_by(|a, b| cost_order(a.0, b.0));
    }

    let mut chain: Vec<SearchStrategy> = candidates
        .into_iter()
        .enumerate()
        .map(|(priority, (cap, query))| SearchStrategy {
            provider_id: cap.provider_id.clone(),
            query,
            estimated_cost: cap.cost_per_call.max(0.0),
            priority,
            is_backup: priority > 0,
        })
        .collect();
    chain.push(SearchStrategy::offline(&path.title, chain.len()));

    (chain, used_default)
}

/// Resolves an advisor-supplied provider name against the registered providers.
pub fn resolve_provider<'a>(
    raw: &str,
    providers: &'a [ProviderCapability],
) -> Option<&'a ProviderCapability> {
    let wanted = raw.trim().to_lowercase();
    let canonical = PROVIDER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == wanted)
        .map(|(_, id)| id.to_string())
        .unwrap_or(wanted);

    providers
        .iter()
        .find(|p| p.provider_id.eq_ignore_ascii_case(&canonical))
}

fn validate_suggestions<'a>(
    suggestions: &[StrategySuggestion],
    providers: &'a [ProviderCapability],
) -> Vec<(&'a ProviderCapability, String)> {
    let mut seen = HashSet::new();
    suggestions
        .iter()
        .filter_map(|s| {
            let query = s.query.split_whitespace().collect::<Vec<_>>().join(" ");
            if query.is_empty() {
                return None;
            }
            let cap = resolve_provider(&s.provider_id, providers)?;
            if cap.provider_id == OFFLINE_PROVIDER_ID {
                return None;
            }
            seen.insert((cap.provider_id.clone(), query.to_lowercase()))
                .then_some((cap, query))
        })
        .collect()
}

/// Every live provider, cheapest first, searched with the path's keyword query.
fn default_candidates<'a>(
    path: &CareerPath,
    providers: &'a [ProviderCapability],
) -> Vec<(&'a ProviderCapability, String)> {
    let mut live: Vec<&ProviderCapability> = providers
        .iter()
        .filter(|p| p.provider_id != OFFLINE_PROVIDER_ID)
        .collect();
    live.sort_by(|a, b| {
        cost_order(a, b)
            .then_with(|| {
                b.reliability_hint
                    .partial_cmp(&a.reliability_hint)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.provider_id.cmp(&b.provider_id))
    });

    let query = path.keyword_query();
    live.into_iter().map(|cap| (cap, query.clone())).collect()
}

fn cost_order(a: &ProviderCapability, b: &ProviderCapability) -> Ordering {
    a.cost_per_call
        .partial_cmp(&b.cost_per_call)
        .unwrap_or(Ordering::Equal)
}

fn within_budget(cap: &ProviderCapability, budget_remaining: f64) -> bool {
    cap.cost_per_call <= budget_remaining.max(0.0)
}
