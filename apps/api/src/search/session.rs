//! Search Session: one end-to-end run: validate → plan → execute → distribute.
//!
//! The cost ledger is created here per run, so sessions never share spend.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::SearchSettings;
use crate::models::career_path::{CareerPath, CareerPathInput};
use crate::models::job::StandardizedJob;
use crate::planning::advisor::PlanningAdvisor;
use crate::planning::planner::{SearchPlan, StrategyPlanner};
use crate::planning::strategy::SearchStrategy;
use crate::providers::{ExperienceLevel, ProviderCapability, ProviderRegistry};
use crate::search::distributor::{distribute, initial_distribution, AllocationResult};
use crate::search::executor::{SearchExecutor, SearchFilters, StrategyAttempt};
use crate::search::ledger::CostLedger;

pub const MAX_CAREER_PATHS: usize = 5;
pub const MIN_TOTAL_JOBS: usize = 10;
pub const MAX_TOTAL_JOBS: usize = 500;
const DEFAULT_TOTAL_JOBS: usize = 100;
const DEFAULT_MAX_AGE_DAYS: u32 = 7;

// ────────────────────────────────────────────────────────────────────────────
// Request / response shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct JobSearchRequest {
    pub career_paths: Vec<CareerPathInput>,
    #[serde(default = "default_total_jobs")]
    pub total_jobs_requested: usize,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub filters: SearchFilterInput,
    /// Dollar ceiling for this session; the configured default when absent.
    #[serde(default, alias = "budget_ceiling")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub fill_quota: bool,
    /// Upsert every returned job into the job store.
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilterInput {
    #[serde(default)]
    pub experience: Option<ExperienceLevel>,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for SearchFilterInput {
    fn default() -> Self {
        Self {
            experience: None,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

fn default_total_jobs() -> usize {
    DEFAULT_TOTAL_JOBS
}

fn default_location() -> String {
    "remote".to_string()
}

fn default_max_age_days() -> u32 {
    DEFAULT_MAX_AGE_DAYS
}

#[derive(Debug, Clone, Serialize)]
pub struct PathSummary {
    pub requested: usize,
    pub found: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub session_id: Uuid,
    pub strategy_label: String,
    pub total_cost: f64,
    pub budget_ceiling: f64,
    pub deduplication: &'static str,
    pub paths_searched: usize,
    pub deadline_hit: bool,
    pub plans: BTreeMap<String, Vec<SearchStrategy>>,
    pub attempts: BTreeMap<String, Vec<StrategyAttempt>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_jobs: Option<usize>,
}

/// Response body of `POST /api/v1/search-jobs`. Maps are keyed by path title.
#[derive(Debug, Clone, Serialize)]
pub struct JobSearchResponse {
    pub allocation_summary: BTreeMap<String, PathSummary>,
    pub jobs_by_path: BTreeMap<String, Vec<StandardizedJob>>,
    pub total_jobs_found: usize,
    pub search_metadata: SearchMetadata,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("all fallbacks exhausted for {paths} career path(s)")]
    AllFallbacksExhausted { paths: usize },
}

impl JobSearchRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        let invalid = |msg: String| Err(SessionError::InvalidRequest(msg));

        if self.career_paths.is_empty() || self.career_paths.len() > MAX_CAREER_PATHS {
            return invalid(format!(
                "career_paths must contain between 1 and {MAX_CAREER_PATHS} entries"
            ));
        }
        if !(MIN_TOTAL_JOBS..=MAX_TOTAL_JOBS).contains(&self.total_jobs_requested) {
            return invalid(format!(
                "total_jobs_requested must be between {MIN_TOTAL_JOBS} and {MAX_TOTAL_JOBS}"
            ));
        }
        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget < 0.0 {
                return invalid("budget must be a non-negative number".to_string());
            }
        }
        if self.filters.max_age_days == 0 {
            return invalid("filters.max_age_days must be at least 1".to_string());
        }

        let mut titles = HashSet::new();
        let mut ids = HashSet::new();
        for path in &self.career_paths {
            let title = path.title.trim();
            if title.is_empty() {
                return invalid("career path titles must not be empty".to_string());
            }
            if !titles.insert(title.to_lowercase()) {
                return invalid(format!("duplicate career path title '{title}'"));
            }
            let id = path.id.trim();
            if !id.is_empty() && !ids.insert(id.to_string()) {
                return invalid(format!("duplicate career path id '{id}'"));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

/// A finished session, before it is shaped into a response.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub session_id: Uuid,
    pub allocations: Vec<AllocationResult>,
    pub plan: SearchPlan,
    pub attempts: BTreeMap<String, Vec<StrategyAttempt>>,
    pub total_cost: f64,
    pub budget_ceiling: f64,
    pub deadline_hit: bool,
}

impl SearchOutcome {
    pub fn total_found(&self) -> usize {
        self.allocations.iter().map(|a| a.found).sum()
    }

    pub fn into_response(self, persisted_jobs: Option<usize>) -> JobSearchResponse {
        let total_jobs_found = self.total_found();
        let strategy_label = self.plan.label();

        let mut allocation_summary = BTreeMap::new();
        let mut jobs_by_path = BTreeMap::new();
        let mut plans = BTreeMap::new();
        for allocation in self.allocations {
            allocation_summary.insert(
                allocation.title.clone(),
                PathSummary {
                    requested: allocation.requested,
                    found: allocation.found,
                },
            );
            plans.insert(
                allocation.title.clone(),
                self.plan.strategies_for(&allocation.career_path_id).to_vec(),
            );
            jobs_by_path.insert(allocation.title, allocation.jobs);
        }

        JobSearchResponse {
            allocation_summary,
            jobs_by_path,
            total_jobs_found,
            search_metadata: SearchMetadata {
                session_id: self.session_id,
                strategy_label,
                total_cost: self.total_cost,
                budget_ceiling: self.budget_ceiling,
                deduplication: "per_path",
                paths_searched: plans.len(),
                deadline_hit: self.deadline_hit,
                plans,
                attempts: self.attempts,
                persisted_jobs,
            },
        }
    }
}

pub struct SearchSession {
    planner: StrategyPlanner,
    executor: SearchExecutor,
    capabilities: Vec<ProviderCapability>,
    default_budget: f64,
    deadline: Duration,
}

impl SearchSession {
    pub fn new(
        advisor: Arc<dyn PlanningAdvisor>,
        providers: ProviderRegistry,
        settings: &SearchSettings,
    ) -> Self {
        Self {
            planner: StrategyPlanner::new(advisor),
            capabilities: providers.capabilities(),
            executor: SearchExecutor::new(providers, settings.executor_config()),
            default_budget: settings.budget_ceiling,
            deadline: settings.executor_config().deadline,
        }
    }

    pub async fn run(&self, request: &JobSearchRequest) -> Result<SearchOutcome, SessionError> {
        request.validate()?;
        // One clock for planning and execution together.
        let deadline = Instant::now() + self.deadline;

        let session_id = Uuid::new_v4();
        let total = request.total_jobs_requested;
        let budget = request.budget.unwrap_or(self.default_budget);

        let shares = initial_distribution(total, request.career_paths.len());
        let paths: Vec<CareerPath> = request
            .career_paths
            .iter()
            .zip(shares)
            .enumerate()
            .map(|(i, (input, share))| {
                let mut path = CareerPath::from_input(input, share);
                if path.id.is_empty() {
                    path.id = format!("path-{}", i + 1);
                }
                path
            })
            .collect();

        info!(
            "Session {session_id}: {} path(s), {total} jobs requested, budget ${budget:.3}",
            paths.len()
        );

        let ledger = Arc::new(CostLedger::new(budget));
        let plan = self
            .planner
            .plan(&paths, &self.capabilities, ledger.remaining(), deadline)
            .await;

        let chains = paths
            .iter()
            .map(|p| (p.clone(), plan.strategies_for(&p.id).to_vec()))
            .collect();
        let filters = SearchFilters {
            location: Some(request.location.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            experience: request.filters.experience,
            max_age_days: request.filters.max_age_days,
            limit: total,
            fill_quota: request.fill_quota,
        };

        let report = self
            .executor
            .execute_until(chains, filters, ledger.clone(), deadline)
            .await;
        if report.all_exhausted() {
            error!(
                "Session {session_id}: every strategy failed for all {} path(s)",
                paths.len()
            );
            return Err(SessionError::AllFallbacksExhausted { paths: paths.len() });
        }

        let attempts = report
            .results
            .iter()
            .map(|r| (r.title.clone(), r.attempts.clone()))
            .collect();
        let deadline_hit = report.deadline_hit;
        let allocations = distribute(total, report.results);

        let outcome = SearchOutcome {
            session_id,
            allocations,
            plan,
            attempts,
            total_cost: ledger.spent(),
            budget_ceiling: ledger.ceiling(),
            deadline_hit,
        };
        info!(
            "Session {session_id}: found {}/{total} jobs, spent ${:.3}",
            outcome.total_found(),
            outcome.total_cost
        );
        Ok(outcome)
    }
}
