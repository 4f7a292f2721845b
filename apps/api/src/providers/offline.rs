//! Offline fallback: synthetic listings that cost nothing and never fail.
//!
//! Every plan ends with this provider so a session always makes progress,
//! even under a total provider outage or an expired deadline.

use async_trait::async_trait;

use crate::models::job::{SalaryRange, StandardizedJob};
use crate::providers::normalize::slugify;
use crate::providers::{ProviderAdapter, ProviderCapability, ProviderError, SearchRequest};

pub const OFFLINE_PROVIDER_ID: &str = "offline";
pub const OFFLINE_MAX_RESULTS: usize = 10;

pub struct OfflineProvider {
    capability: ProviderCapability,
}

impl OfflineProvider {
    pub fn new() -> Self {
        Self {
            capability: ProviderCapability {
                provider_id: OFFLINE_PROVIDER_ID.to_string(),
                cost_per_call: 0.0,
                supports_location_filter: false,
                supports_experience_filter: false,
                reliability_hint: 1.0,
            },
        }
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for OfflineProvider {
    fn capability(&self) -> &ProviderCapability {
        &self.capability
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StandardizedJob>, ProviderError> {
        Ok(synthesize(&request.query, request.limit))
    }
}

/// Generates between 1 and [`OFFLINE_MAX_RESULTS`] deterministic listings.
/// Synchronous so a deadline-forced path can call it without awaiting.
pub fn synthesize(path_title: &str, limit: usize) -> Vec<StandardizedJob> {
    let title = if path_title.trim().is_empty() {
        "General"
    } else {
        path_title.trim()
    };
    let slug = slugify(title);
    let count = limit.clamp(1, OFFLINE_MAX_RESULTS);

    (1..=count)
        .map(|n| StandardizedJob {
            title: format!("{title} Position {n}"),
            company: format!("Company {n}"),
            location: "Remote".to_string(),
            description: format!(
                "Placeholder listing for {title}. Generated while live job sources were unavailable."
            ),
            url: format!("https://example.com/jobs/{slug}-{n}"),
            posted_date: None,
            salary_range: Some(SalaryRange {
                min: 80_000.0,
                max: 150_000.0,
                currency: "USD".to_string(),
            }),
            source_provider_id: OFFLINE_PROVIDER_ID.to_string(),
        })
        .collect()
}
