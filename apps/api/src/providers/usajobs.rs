//! USAJobs: federal government listings. Free; supports location filtering.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::job::StandardizedJob;
use crate::providers::normalize::{join_location, parse_posted_date, salary_from_bounds, simplify_query};
use crate::providers::{fetch_json, ProviderAdapter, ProviderCapability, ProviderError, SearchRequest};

pub const USAJOBS_PROVIDER_ID: &str = "usajobs";
const USAJOBS_API_URL: &str = "https://data.usajobs.gov/api/search";
const MAX_RESULTS_PER_PAGE: usize = 25;
const MAX_KEYWORDS: usize = 4;
/// The API rejects `DatePosted` values above 60.
const MAX_DATE_POSTED_DAYS: u32 = 60;
const DEFAULT_ORGANIZATION: &str = "U.S. Federal Government";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UsaJobsResponse {
    #[serde(default)]
    search_result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    #[serde(default)]
    search_result_items: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResultItem {
    matched_object_descriptor: PositionDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionDescriptor {
    #[serde(default)]
    position_title: String,
    organization_name: Option<String>,
    #[serde(default)]
    position_location: Vec<PositionLocation>,
    #[serde(default)]
    position_remuneration: Vec<Remuneration>,
    publication_start_date: Option<String>,
    position_start_date: Option<String>,
    #[serde(rename = "PositionURI", default)]
    position_uri: String,
    user_area: Option<UserArea>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionLocation {
    city_name: Option<String>,
    state_code: Option<String>,
    location_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Remuneration {
    minimum_range: Option<String>,
    maximum_range: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserArea {
    details: Option<UserAreaDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserAreaDetails {
    job_summary: Option<String>,
}

pub struct UsaJobsProvider {
    client: Client,
    api_key: String,
    user_agent: String,
    capability: ProviderCapability,
}

impl UsaJobsProvider {
    pub fn new(client: Client, api_key: String, user_agent: String) -> Self {
        Self {
            client,
            api_key,
            user_agent,
            capability: ProviderCapability {
                provider_id: USAJOBS_PROVIDER_ID.to_string(),
                cost_per_call: 0.0,
                supports_location_filter: true,
                supports_experience_filter: false,
                reliability_hint: 0.85,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for UsaJobsProvider {
    fn capability(&self) -> &ProviderCapability {
        &self.capability
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StandardizedJob>, ProviderError> {
        let keyword = simplify_query(&request.query, MAX_KEYWORDS);
        let mut params: Vec<(&str, String)> = vec![
            ("Keyword", keyword.clone()),
            (
                "ResultsPerPage",
                request.limit.clamp(1, MAX_RESULTS_PER_PAGE).to_string(),
            ),
            ("Page", "1".to_string()),
            (
                "DatePosted",
                request.max_age_days.min(MAX_DATE_POSTED_DAYS).to_string(),
            ),
        ];
        match request.location.as_deref().map(str::trim) {
            Some(loc) if loc.eq_ignore_ascii_case("remote") => {
                params.push(("RemoteIndicator", "True".to_string()));
            }
            Some(loc) if !loc.is_empty() => params.push(("LocationName", loc.to_string())),
            _ => {}
        }

        let http = self
            .client
            .get(USAJOBS_API_URL)
            .header("Authorization-Key", &self.api_key)
            .header("User-Agent", &self.user_agent)
            .query(&params);

        let response: UsaJobsResponse = fetch_json(http, USAJOBS_PROVIDER_ID).await?;
        let jobs = normalize_response(response, request.limit);
        debug!("USAJobs returned {} jobs for '{keyword}'", jobs.len());
        Ok(jobs)
    }
}

fn normalize_response(response: UsaJobsResponse, limit: usize) -> Vec<StandardizedJob> {
    let today = Utc::now().date_naive();
    response
        .search_result
        .search_result_items
        .into_iter()
        .map(|item| item.matched_object_descriptor)
        .filter(|d| !d.position_title.trim().is_empty())
        .take(limit)
        .map(|d| {
            let location = d
                .position_location
                .first()
                .and_then(|loc| {
                    join_location(loc.city_name.as_deref(), loc.state_code.as_deref())
                        .or_else(|| loc.location_name.clone())
                })
                .unwrap_or_else(|| "Not specified".to_string());

            let salary_range = d.position_remuneration.first().and_then(|r| {
                salary_from_bounds(
                    r.minimum_range.as_deref().and_then(|v| v.parse().ok()),
                    r.maximum_range.as_deref().and_then(|v| v.parse().ok()),
                    "USD",
                )
            });

            let posted_date = d
                .publication_start_date
                .as_deref()
                .or(d.position_start_date.as_deref())
                .and_then(|raw| parse_posted_date(raw, today));

            StandardizedJob {
                title: d.position_title.trim().to_string(),
                company: d
                    .organization_name
                    .filter(|o| !o.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
                location,
                description: d
                    .user_area
                    .and_then(|u| u.details)
                    .and_then(|det| det.job_summary)
                    .unwrap_or_default(),
                url: d.position_uri,
                posted_date,
                salary_range,
                source_provider_id: USAJOBS_PROVIDER_ID.to_string(),
            }
        })
        .collect()
}
