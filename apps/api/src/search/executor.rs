//! Search Executor: runs every career path's strategy chain concurrently.
//!
//! One task per path, strategies within a path strictly in order. Each
//! strategy walks `Pending → Reserving → (Running | Fallback) → (Succeeded | Failed)`
//! and leaves a [`StrategyAttempt`] behind. Provider calls share a semaphore,
//! and every await (permit, call, backoff) is bounded by the session deadline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::models::career_path::CareerPath;
use crate::models::job::{DedupKey, StandardizedJob};
use crate::planning::strategy::SearchStrategy;
use crate::providers::offline::synthesize;
use crate::providers::{
    ExperienceLevel, ProviderAdapter, ProviderCapability, ProviderError, ProviderRegistry,
    SearchRequest, OFFLINE_PROVIDER_ID,
};
use crate::search::ledger::CostLedger;

/// First call plus one retry for transient failures.
const MAX_CALLS_PER_STRATEGY: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Outbound provider calls allowed at once, across all paths.
    pub max_in_flight: usize,
    pub call_timeout: Duration,
    /// Wall-clock budget for the whole session.
    pub deadline: Duration,
    pub backoff_base: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            call_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(25),
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Request-level filters applied to every provider call in a session.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub location: Option<String>,
    pub experience: Option<ExperienceLevel>,
    pub max_age_days: u32,
    /// Per-call result cap; the session's total requested count.
    pub limit: usize,
    /// Keep walking the chain after a hit until the path's share is filled.
    pub fill_quota: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Per-strategy state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyState {
    Pending,
    Reserving,
    Running,
    Fallback,
    Succeeded,
    Failed,
}

/// Terminal outcome of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded { jobs: usize },
    /// The provider answered but had nothing; the cost is kept.
    Empty,
    BudgetRejected { remaining: f64 },
    RateLimited,
    Permanent { reason: String },
    TransientExhausted { reason: String },
    ProviderMissing,
    DeadlineExceeded,
}

impl AttemptOutcome {
    fn terminal_state(&self) -> StrategyState {
        match self {
            AttemptOutcome::Succeeded { .. } | AttemptOutcome::Empty => StrategyState::Succeeded,
            AttemptOutcome::BudgetRejected { .. } => StrategyState::Fallback,
            _ => StrategyState::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyAttempt {
    pub provider_id: String,
    pub query: String,
    pub priority: usize,
    /// Provider calls made, including the retry.
    pub calls: u32,
    /// Dollars kept on the ledger for this strategy.
    pub cost: f64,
    pub final_state: StrategyState,
    pub outcome: AttemptOutcome,
}

struct StrategyRun<'a> {
    path_title: &'a str,
    strategy: &'a SearchStrategy,
    state: StrategyState,
    calls: u32,
    cost: f64,
}

impl<'a> StrategyRun<'a> {
    fn new(path_title: &'a str, strategy: &'a SearchStrategy) -> Self {
        Self {
            path_title,
            strategy,
            state: StrategyState::Pending,
            calls: 0,
            cost: 0.0,
        }
    }

    fn advance(&mut self, next: StrategyState) {
        debug!(
            "'{}' [{}:{}] {:?} → {:?}",
            self.path_title, self.strategy.provider_id, self.strategy.query, self.state, next
        );
        self.state = next;
    }

    fn finish(mut self, outcome: AttemptOutcome) -> StrategyAttempt {
        self.advance(outcome.terminal_state());
        StrategyAttempt {
            provider_id: self.strategy.provider_id.clone(),
            query: self.strategy.query.clone(),
            priority: self.strategy.priority,
            calls: self.calls,
            cost: self.cost,
            final_state: self.state,
            outcome,
        }
    }
}

#[derive(Debug, Error)]
enum CallFailure {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("session deadline reached")]
    Deadline,
}

impl CallFailure {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallFailure::TimedOut(_) | CallFailure::Provider(ProviderError::Transient(_))
        )
    }

    fn into_outcome(self) -> AttemptOutcome {
        match self {
            CallFailure::Provider(ProviderError::Transient(reason)) => {
                AttemptOutcome::TransientExhausted { reason }
            }
            CallFailure::Provider(ProviderError::RateLimited(_)) => AttemptOutcome::RateLimited,
            CallFailure::Provider(ProviderError::Permanent(reason)) => {
                AttemptOutcome::Permanent { reason }
            }
            timed_out @ CallFailure::TimedOut(_) => AttemptOutcome::TransientExhausted {
                reason: timed_out.to_string(),
            },
            CallFailure::Deadline => AttemptOutcome::DeadlineExceeded,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

/// Everything one path's task produced.
#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    pub career_path_id: String,
    pub title: String,
    /// In the order strategies produced them; may contain duplicates.
    pub jobs: Vec<StandardizedJob>,
    pub attempts: Vec<StrategyAttempt>,
    pub cost_spent: f64,
    pub resolved_by: Option<String>,
    pub forced_offline: bool,
    pub exhausted: bool,
}

impl PathResult {
    fn new(path: &CareerPath) -> Self {
        Self {
            career_path_id: path.id.clone(),
            title: path.title.clone(),
            jobs: Vec::new(),
            attempts: Vec::new(),
            cost_spent: 0.0,
            resolved_by: None,
            forced_offline: false,
            exhausted: false,
        }
    }

    /// Stand-in for a path whose task died before reporting.
    fn lost(path: &CareerPath) -> Self {
        Self {
            exhausted: true,
            ..Self::new(path)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// One entry per input path, in input order.
    pub results: Vec<PathResult>,
    pub deadline_hit: bool,
}

impl ExecutionReport {
    pub fn all_exhausted(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.exhausted)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Executor
// ────────────────────────────────────────────────────────────────────────────

pub struct SearchExecutor {
    providers: ProviderRegistry,
    config: ExecutorConfig,
}

struct RunContext {
    providers: ProviderRegistry,
    ledger: Arc<CostLedger>,
    permits: Semaphore,
    filters: SearchFilters,
    config: ExecutorConfig,
    deadline: Instant,
}

impl SearchExecutor {
    pub fn new(providers: ProviderRegistry, config: ExecutorConfig) -> Self {
        Self { providers, config }
    }

    /// Runs every chain with a deadline of `config.deadline` from now.
    pub async fn execute(
        &self,
        chains: Vec<(CareerPath, Vec<SearchStrategy>)>,
        filters: SearchFilters,
        ledger: Arc<CostLedger>,
    ) -> ExecutionReport {
        let deadline = Instant::now() + self.config.deadline;
        self.execute_until(chains, filters, ledger, deadline).await
    }

    /// Runs every chain to a terminal state or until `deadline`, whichever
    /// comes first. Provider failures never surface as errors here.
    pub async fn execute_until(
        &self,
        chains: Vec<(CareerPath, Vec<SearchStrategy>)>,
        filters: SearchFilters,
        ledger: Arc<CostLedger>,
        deadline: Instant,
    ) -> ExecutionReport {
        let ctx = Arc::new(RunContext {
            providers: self.providers.clone(),
            ledger,
            permits: Semaphore::new(self.config.max_in_flight.max(1)),
            filters,
            config: self.config,
            deadline,
        });

        let mut tasks = JoinSet::new();
        for (index, (path, strategies)) in chains.iter().cloned().enumerate() {
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move { (index, run_path(&ctx, &path, &strategies).await) });
        }

        let mut slots: Vec<Option<PathResult>> = vec![None; chains.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!("Path search task failed: {e}"),
            }
        }

        let results: Vec<PathResult> = chains
            .iter()
            .zip(slots)
            .map(|((path, _), slot)| slot.unwrap_or_else(|| PathResult::lost(path)))
            .collect();

        let deadline_hit = results.iter().any(|r| {
            r.forced_offline
                || r.attempts
                    .iter()
                    .any(|a| a.outcome == AttemptOutcome::DeadlineExceeded)
        });

        ExecutionReport {
            results,
            deadline_hit,
        }
    }
}

async fn run_path(ctx: &RunContext, path: &CareerPath, strategies: &[SearchStrategy]) -> PathResult {
    let mut result = PathResult::new(path);
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut deadline_reached = false;

    for strategy in strategies {
        if !result.jobs.is_empty() {
            let wants_more = ctx.filters.fill_quota && seen.len() < path.requested_count;
            if strategy.is_offline() || !wants_more {
                break;
            }
        }
        if Instant::now() >= ctx.deadline {
            deadline_reached = true;
            break;
        }

        let (attempt, jobs) = run_strategy(ctx, path, strategy).await;
        result.cost_spent += attempt.cost;

        match attempt.outcome {
            AttemptOutcome::Succeeded { .. } => {
                result
                    .resolved_by
                    .get_or_insert_with(|| strategy.provider_id.clone());
                seen.extend(jobs.iter().map(StandardizedJob::dedup_key));
                result.jobs.extend(jobs);
            }
            AttemptOutcome::DeadlineExceeded => deadline_reached = true,
            _ => {}
        }
        result.attempts.push(attempt);

        if deadline_reached {
            break;
        }
    }

    if deadline_reached && result.jobs.is_empty() {
        force_offline(&mut result, path, ctx.filters.limit, strategies.len());
    }

    result.exhausted = result.jobs.is_empty();
    if result.exhausted {
        warn!(
            "Every strategy failed for '{}' after {} attempts",
            path.title,
            result.attempts.len()
        );
    } else {
        info!(
            "'{}' resolved by {} with {} jobs (${:.3} spent)",
            path.title,
            result.resolved_by.as_deref().unwrap_or("-"),
            result.jobs.len(),
            result.cost_spent
        );
    }
    result
}

/// Deadline fallback. Synchronous, so it cannot itself overrun the deadline.
fn force_offline(result: &mut PathResult, path: &CareerPath, limit: usize, priority: usize) {
    let jobs = synthesize(&path.title, limit);
    warn!(
        "Session deadline reached for '{}'; serving {} offline listings",
        path.title,
        jobs.len()
    );
    result.attempts.push(StrategyAttempt {
        provider_id: OFFLINE_PROVIDER_ID.to_string(),
        query: path.title.clone(),
        priority,
        calls: 0,
        cost: 0.0,
        final_state: StrategyState::Succeeded,
        outcome: AttemptOutcome::Succeeded { jobs: jobs.len() },
    });
    result.resolved_by = Some(OFFLINE_PROVIDER_ID.to_string());
    result.forced_offline = true;
    result.jobs = jobs;
}

async fn run_strategy(
    ctx: &RunContext,
    path: &CareerPath,
    strategy: &SearchStrategy,
) -> (StrategyAttempt, Vec<StandardizedJob>) {
    let mut run = StrategyRun::new(&path.title, strategy);

    let Some(adapter) = ctx.providers.get(&strategy.provider_id) else {
        warn!("Provider '{}' is not registered; skipping", strategy.provider_id);
        return (run.finish(AttemptOutcome::ProviderMissing), Vec::new());
    };

    run.advance(StrategyState::Reserving);
    let reservation = ctx.ledger.reserve(strategy.estimated_cost);
    if !reservation.granted {
        info!(
            "Budget rejected {} (${:.3}) for '{}'; ${:.3} left",
            strategy.provider_id, strategy.estimated_cost, path.title, reservation.remaining
        );
        return (
            run.finish(AttemptOutcome::BudgetRejected {
                remaining: reservation.remaining,
            }),
            Vec::new(),
        );
    }

    run.advance(StrategyState::Running);
    let request = build_request(adapter.capability(), strategy, &ctx.filters);

    loop {
        run.calls += 1;
        let failure = match call_provider(ctx, adapter.as_ref(), &request).await {
            Ok(jobs) => {
                run.cost = strategy.estimated_cost;
                let outcome = if jobs.is_empty() {
                    AttemptOutcome::Empty
                } else {
                    AttemptOutcome::Succeeded { jobs: jobs.len() }
                };
                return (run.finish(outcome), jobs);
            }
            Err(failure) => failure,
        };

        if failure.is_retryable() && run.calls < MAX_CALLS_PER_STRATEGY {
            let backoff = ctx.config.backoff_base * 2u32.pow(run.calls - 1);
            let wake = Instant::now() + backoff;
            if wake < ctx.deadline {
                warn!(
                    "{} failed for '{}' ({failure}); retrying in {}ms",
                    strategy.provider_id,
                    path.title,
                    backoff.as_millis()
                );
                sleep_until(wake).await;
                continue;
            }
            info!(
                "No time left to retry {} for '{}'; moving to the next strategy",
                strategy.provider_id, path.title
            );
        }

        ctx.ledger.release(strategy.estimated_cost);
        warn!(
            "{} gave up for '{}' after {} call(s): {failure}",
            strategy.provider_id, path.title, run.calls
        );
        return (run.finish(failure.into_outcome()), Vec::new());
    }
}

async fn call_provider(
    ctx: &RunContext,
    adapter: &dyn ProviderAdapter,
    request: &SearchRequest,
) -> Result<Vec<StandardizedJob>, CallFailure> {
    let _permit = match timeout_at(ctx.deadline, ctx.permits.acquire()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) => {
            return Err(CallFailure::Provider(ProviderError::Transient(
                "provider call permits closed".to_string(),
            )))
        }
        Err(_) => return Err(CallFailure::Deadline),
    };

    let call_deadline = (Instant::now() + ctx.config.call_timeout).min(ctx.deadline);
    match timeout_at(call_deadline, adapter.search(request)).await {
        Ok(result) => result.map_err(CallFailure::from),
        Err(_) if call_deadline >= ctx.deadline => Err(CallFailure::Deadline),
        Err(_) => Err(CallFailure::TimedOut(ctx.config.call_timeout)),
    }
}

/// Forwards only the filters the provider can honour.
fn build_request(
    capability: &ProviderCapability,
    strategy: &SearchStrategy,
    filters: &SearchFilters,
) -> SearchRequest {
    SearchRequest {
        query: strategy.query.clone(),
        location: filters
            .location
            .clone()
            .filter(|_| capability.supports_location_filter),
        experience: filters
            .experience
            .filter(|_| capability.supports_experience_filter),
        max_age_days: filters.max_age_days,
        limit: filters.limit.max(1),
    }
}
