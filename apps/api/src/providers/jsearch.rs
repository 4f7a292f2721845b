//! JSearch (RapidAPI): search-engine-backed aggregator. Paid per call;
//! strongest for tech and remote roles.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::job::StandardizedJob;
use crate::providers::normalize::{focus_query, join_location, parse_posted_date, salary_from_bounds};
use crate::providers::{
    fetch_json, ExperienceLevel, ProviderAdapter, ProviderCapability, ProviderError, SearchRequest,
};

pub const JSEARCH_PROVIDER_ID: &str = "jsearch";
pub const JSEARCH_COST_PER_CALL: f64 = 0.005;
const MAX_QUERY_WORDS: usize = 5;

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    #[serde(default)]
    job_title: String,
    #[serde(default)]
    employer_name: String,
    job_city: Option<String>,
    job_state: Option<String>,
    job_is_remote: Option<bool>,
    #[serde(default)]
    job_description: String,
    #[serde(default)]
    job_apply_link: String,
    job_posted_at_datetime_utc: Option<String>,
    job_min_salary: Option<f64>,
    job_max_salary: Option<f64>,
    job_salary_currency: Option<String>,
}

pub struct JSearchProvider {
    client: Client,
    api_key: String,
    host: String,
    capability: ProviderCapability,
}

impl JSearchProvider {
    pub fn new(client: Client, api_key: String, host: String) -> Self {
        Self {
            client,
            api_key,
            host,
            capability: ProviderCapability {
                provider_id: JSEARCH_PROVIDER_ID.to_string(),
                cost_per_call: JSEARCH_COST_PER_CALL,
                supports_location_filter: true,
                supports_experience_filter: true,
                reliability_hint: 0.9,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for JSearchProvider {
    fn capability(&self) -> &ProviderCapability {
        &self.capability
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StandardizedJob>, ProviderError> {
        let params = build_params(request);
        let url = format!("https://{}/search", self.host);

        let http = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .query(&params);

        let response: JSearchResponse = fetch_json(http, JSEARCH_PROVIDER_ID).await?;
        let jobs = normalize_response(response, request.limit);
        debug!("JSearch returned {} jobs for '{}'", jobs.len(), request.query);
        Ok(jobs)
    }
}

fn build_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut query = focus_query(&request.query, MAX_QUERY_WORDS);
    let mut params = Vec::new();

    match request.location.as_deref().map(str::trim) {
        Some(loc) if loc.eq_ignore_ascii_case("remote") => {
            params.push(("remote_jobs_only", "true".to_string()));
        }
        Some(loc) if !loc.is_empty() => {
            query = format!("{query} in {loc}");
        }
        _ => {}
    }

    params.push(("query", query));
    params.push(("page", "1".to_string()));
    params.push(("num_pages", "1".to_string()));
    params.push(("date_posted", date_posted_bucket(request.max_age_days).to_string()));

    if let Some(level) = request.experience {
        let requirements = match level {
            ExperienceLevel::Entry => "no_experience,under_3_years_experience",
            ExperienceLevel::Mid | ExperienceLevel::Senior => "more_than_3_years_experience",
        };
        params.push(("job_requirements", requirements.to_string()));
    }
    params
}

fn date_posted_bucket(max_age_days: u32) -> &'static str {
    match max_age_days {
        0..=1 => "today",
        2..=3 => "3days",
        4..=7 => "week",
        8..=30 => "month",
        _ => "all",
    }
}

fn normalize_response(response: JSearchResponse, limit: usize) -> Vec<StandardizedJob> {
    let today = Utc::now().date_naive();
    response
        .data
        .into_iter()
        .filter(|j| !j.job_title.trim().is_empty())
        .take(limit)
        .map(|j| {
            let location = join_location(j.job_city.as_deref(), j.job_state.as_deref())
                .or_else(|| j.job_is_remote.filter(|r| *r).map(|_| "Remote".to_string()))
                .unwrap_or_else(|| "Not specified".to_string());
            let currency = j.job_salary_currency.as_deref().unwrap_or("USD");

            StandardizedJob {
                title: j.job_title.trim().to_string(),
                company: j.employer_name.trim().to_string(),
                location,
                salary_range: salary_from_bounds(j.job_min_salary, j.job_max_salary, currency),
                posted_date: j
                    .job_posted_at_datetime_utc
                    .as_deref()
                    .and_then(|raw| parse_posted_date(raw, today)),
                description: j.job_description,
                url: j.job_apply_link,
                source_provider_id: JSEARCH_PROVIDER_ID.to_string(),
            }
        })
        .collect()
}
