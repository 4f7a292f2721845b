use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::providers::ProviderCapability;
use crate::search::session::{JobSearchRequest, JobSearchResponse, SearchOutcome, SearchSession};
use crate::state::AppState;
use crate::store::{JobStore, STATUS_NEW};

/// POST /api/v1/search-jobs
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Json(req): Json<JobSearchRequest>,
) -> Result<Json<JobSearchResponse>, AppError> {
    let session = SearchSession::new(
        state.advisor.clone(),
        state.providers.clone(),
        &state.config.search,
    );
    let outcome = session.run(&req).await?;

    let persisted = if req.persist {
        Some(persist_outcome(state.store.as_ref(), &outcome).await?)
    } else {
        None
    };

    Ok(Json(outcome.into_response(persisted)))
}

/// GET /api/v1/providers
pub async fn handle_list_providers(
    State(state): State<AppState>,
) -> Json<Vec<ProviderCapability>> {
    Json(state.providers.capabilities())
}

/// Upserts every allocated job tagged with its career path. Returns how many
/// records were newly created.
async fn persist_outcome(store: &dyn JobStore, outcome: &SearchOutcome) -> Result<usize, AppError> {
    let mut created = 0;
    for allocation in &outcome.allocations {
        for job in &allocation.jobs {
            let stored = store
                .upsert(job, STATUS_NEW, Some(allocation.title.as_str()))
                .await?;
            if stored.created {
                created += 1;
            }
        }
    }
    info!(
        "Session {}: persisted {created} new job(s)",
        outcome.session_id
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use uuid::Uuid;

    use super::*;
    use crate::models::job::StandardizedJob;
    use crate::planning::planner::SearchPlan;
    use crate::search::distributor::AllocationResult;
    use crate::store::memory::MemoryJobStore;

    fn listing() -> StandardizedJob {
        StandardizedJob {
            title: "Analytics Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: String::new(),
            url: "https://acme.io/jobs/42".to_string(),
            posted_date: None,
            salary_range: None,
            source_provider_id: "jsearch".to_string(),
        }
    }

    fn allocation(title: &str) -> AllocationResult {
        AllocationResult {
            career_path_id: title.to_lowercase(),
            title: title.to_string(),
            requested: 10,
            available: 1,
            found: 1,
            jobs: vec![listing()],
        }
    }

    #[tokio::test]
    async fn test_listing_shared_by_two_paths_keeps_first_path() {
        let outcome = SearchOutcome {
            session_id: Uuid::new_v4(),
            allocations: vec![allocation("Data Analyst"), allocation("BI Developer")],
            plan: SearchPlan {
                strategies: HashMap::new(),
                advisor: "keyword".to_string(),
                defaulted: vec![],
            },
            attempts: BTreeMap::new(),
            total_cost: 0.0,
            budget_ceiling: 0.20,
            deadline_hit: false,
        };
        let store = MemoryJobStore::default();

        let created = persist_outcome(&store, &outcome).await.unwrap();

        assert_eq!(created, 1);
        assert_eq!(store.count(), 1);
        assert_eq!(
            store.career_path_of(&listing()).as_deref(),
            Some("Data Analyst")
        );
    }
}
