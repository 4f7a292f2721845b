//! Adzuna: broad-coverage aggregator. Free; prefers short, plain queries.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::job::StandardizedJob;
use crate::providers::normalize::{parse_posted_date, salary_from_bounds, simplify_query};
use crate::providers::{fetch_json, ProviderAdapter, ProviderCapability, ProviderError, SearchRequest};

pub const ADZUNA_PROVIDER_ID: &str = "adzuna";
const ADZUNA_API_BASE: &str = "https://api.adzuna.com/v1/api/jobs";
const MAX_RESULTS_PER_PAGE: usize = 50;
const MAX_KEYWORDS: usize = 3;

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    title: String,
    company: Option<AdzunaCompany>,
    location: Option<AdzunaLocation>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    redirect_url: String,
    created: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaLocation {
    display_name: Option<String>,
    #[serde(default)]
    area: Vec<String>,
}

pub struct AdzunaProvider {
    client: Client,
    app_id: String,
    app_key: String,
    country: String,
    capability: ProviderCapability,
}

impl AdzunaProvider {
    pub fn new(client: Client, app_id: String, app_key: String, country: String) -> Self {
        Self {
            client,
            app_id,
            app_key,
            country: country.to_lowercase(),
            capability: ProviderCapability {
                provider_id: ADZUNA_PROVIDER_ID.to_string(),
                cost_per_call: 0.0,
                supports_location_filter: true,
                supports_experience_filter: false,
                reliability_hint: 0.8,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for AdzunaProvider {
    fn capability(&self) -> &ProviderCapability {
        &self.capability
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StandardizedJob>, ProviderError> {
        let what = simplify_query(&request.query, MAX_KEYWORDS);
        let mut params: Vec<(&str, String)> = vec![
            ("app_id", self.app_id.clone()),
            ("app_key", self.app_key.clone()),
            ("what", what.clone()),
            (
                "results_per_page",
                request.limit.clamp(1, MAX_RESULTS_PER_PAGE).to_string(),
            ),
            ("max_days_old", request.max_age_days.max(1).to_string()),
        ];
        // Adzuna has no "remote" location; leave `where` out instead.
        if let Some(location) = request
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty() && !l.trim().eq_ignore_ascii_case("remote"))
        {
            params.push(("where", location.to_string()));
        }

        let url = format!("{ADZUNA_API_BASE}/{}/search/1", self.country);
        let http = self.client.get(url).query(&params);

        let response: AdzunaResponse = fetch_json(http, ADZUNA_PROVIDER_ID).await?;
        let jobs = normalize_response(response, currency_for(&self.country), request.limit);
        debug!("Adzuna returned {} jobs for '{what}'", jobs.len());
        Ok(jobs)
    }
}

fn currency_for(country: &str) -> &'static str {
    match country {
        "gb" => "GBP",
        "de" | "fr" | "nl" | "it" | "es" | "at" | "be" => "EUR",
        "ca" => "CAD",
        "au" => "AUD",
        "in" => "INR",
        _ => "USD",
    }
}

fn normalize_response(response: AdzunaResponse, currency: &str, limit: usize) -> Vec<StandardizedJob> {
    let today = Utc::now().date_naive();
    response
        .results
        .into_iter()
        .filter(|j| !j.title.trim().is_empty())
        .take(limit)
        .map(|j| {
            let location = j
                .location
                .and_then(|loc| {
                    loc.display_name
                        .filter(|d| !d.trim().is_empty())
                        .or_else(|| match loc.area.as_slice() {
                            [.., region, city] => Some(format!("{city}, {region}")),
                            [only] => Some(only.clone()),
                            _ => None,
                        })
                })
                .unwrap_or_else(|| "Not specified".to_string());

            StandardizedJob {
                title: j.title.trim().to_string(),
                company: j
                    .company
                    .and_then(|c| c.display_name)
                    .unwrap_or_default(),
                location,
                salary_range: salary_from_bounds(j.salary_min, j.salary_max, currency),
                posted_date: j
                    .created
                    .as_deref()
                    .and_then(|raw| parse_posted_date(raw, today)),
                description: j.description,
                url: j.redirect_url,
                source_provider_id: ADZUNA_PROVIDER_ID.to_string(),
            }
        })
        .collect()
}
