//! Planning advisors: pluggable sources of ranked search suggestions.
//!
//! Default: `KeywordAdvisor` (pure-Rust, deterministic, no network).
//! With `GEMINI_API_KEY` set: `LlmPlanningAdvisor`.
//!
//! `AppState` holds an `Arc<dyn PlanningAdvisor>`, chosen at startup via config.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::planning::prompts::{planning_system, PLANNING_PROMPT_TEMPLATE};
use crate::planning::strategy::StrategySuggestion;
use crate::providers::adzuna::ADZUNA_PROVIDER_ID;
use crate::providers::jsearch::JSEARCH_PROVIDER_ID;
use crate::providers::normalize::contains_term;
use crate::providers::usajobs::USAJOBS_PROVIDER_ID;
use crate::providers::{ProviderCapability, OFFLINE_PROVIDER_ID};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Everything an advisor may look at when ranking searches for one path.
#[derive(Debug, Clone)]
pub struct AdvisorRequest {
    pub title: String,
    pub keywords: Vec<String>,
    pub providers: Vec<ProviderCapability>,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("LLM planning failed: {0}")]
    Llm(#[from] LlmError),

    #[error("planning advisor unavailable: {0}")]
    Unavailable(String),
}

/// Implement this to swap planning backends without touching the planner.
#[async_trait]
pub trait PlanningAdvisor: Send + Sync {
    /// Short backend name, surfaced in the session's strategy label.
    fn name(&self) -> &str;

    async fn suggest(&self, request: &AdvisorRequest)
        -> Result<Vec<StrategySuggestion>, AdvisorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmPlanningAdvisor
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmPlanningAdvisor {
    llm: LlmClient,
}

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    #[serde(default)]
    strategies: Vec<StrategySuggestion>,
}

impl LlmPlanningAdvisor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PlanningAdvisor for LlmPlanningAdvisor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn suggest(
        &self,
        request: &AdvisorRequest,
    ) -> Result<Vec<StrategySuggestion>, AdvisorError> {
        let prompt = build_planning_prompt(request);
        let envelope: SuggestionEnvelope = self.llm.call_json(&prompt, &planning_system()).await?;
        Ok(envelope.strategies)
    }
}

fn build_planning_prompt(request: &AdvisorRequest) -> String {
    let providers = request
        .providers
        .iter()
        .filter(|p| p.provider_id != OFFLINE_PROVIDER_ID)
        .map(|p| {
            format!(
                "- {}: ${:.3}/call, location filter: {}, experience filter: {}, reliability: {:.2}",
                p.provider_id,
                p.cost_per_call,
                yes_no(p.supports_location_filter),
                yes_no(p.supports_experience_filter),
                p.reliability_hint
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let keywords = if request.keywords.is_empty() {
        "(none)".to_string()
    } else {
        request.keywords.join(", ")
    };

    PLANNING_PROMPT_TEMPLATE
        .replace("{title}", &request.title)
        .replace("{keywords}", &keywords)
        .replace("{providers}", &providers)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordAdvisor: default when no LLM is configured
// ────────────────────────────────────────────────────────────────────────────

const ROLE_TERMS: &[&str] = &["engineer", "developer", "architect"];
const SKILL_TERMS: &[&str] = &["python", "ai", "ml", "cloud"];
const GOVERNMENT_TERMS: &[&str] = &["federal", "government"];
const TECH_TITLE_TERMS: &[&str] = &["tech", "developer", "engineer", "remote"];

/// Heuristic advisor.
///
/// 1. Query variations, most specific first: "role skill1 skill2", "role skill1",
///    "role" when the keywords carry both a role and a skill term; otherwise the
///    first three keywords (or the title).
/// 2. Routing: government titles → usajobs, tech titles → jsearch, everything
///    else → adzuna. The primary provider gets every variation, the remaining
///    providers get the most specific one as backups.
pub struct KeywordAdvisor;

impl KeywordAdvisor {
    pub fn query_variations(title: &str, keywords: &[String]) -> Vec<String> {
        let role_terms: Vec<&str> = keywords
            .iter()
            .map(String::as_str)
            .filter(|k| contains_term(k, ROLE_TERMS))
            .collect();
        let skill_terms: Vec<&str> = keywords
            .iter()
            .map(String::as_str)
            .filter(|k| contains_term(k, SKILL_TERMS) && !contains_term(k, ROLE_TERMS))
            .collect();

        let mut queries = match (role_terms.first(), skill_terms.as_slice()) {
            (Some(role), [first, rest @ ..]) => {
                let mut specific = vec![*role, *first];
                specific.extend(rest.iter().take(1));
                vec![specific.join(" "), format!("{role} {first}"), role.to_string()]
            }
            _ if !keywords.is_empty() => vec![keywords
                .iter()
                .take(3)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ")],
            _ => vec![title.to_string()],
        };
        queries.dedup();
        queries
    }

    pub fn primary_provider(title: &str) -> &'static str {
        if contains_term(title, GOVERNMENT_TERMS) {
            USAJOBS_PROVIDER_ID
        } else if contains_term(title, TECH_TITLE_TERMS) {
            JSEARCH_PROVIDER_ID
        } else {
            ADZUNA_PROVIDER_ID
        }
    }
}

#[async_trait]
impl PlanningAdvisor for KeywordAdvisor {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn suggest(
        &self,
        request: &AdvisorRequest,
    ) -> Result<Vec<StrategySuggestion>, AdvisorError> {
        let queries = Self::query_variations(&request.title, &request.keywords);
        let primary = Self::primary_provider(&request.title);
        let available: Vec<&str> = request
            .providers
            .iter()
            .map(|p| p.provider_id.as_str())
            .filter(|id| *id != OFFLINE_PROVIDER_ID)
            .collect();

        let mut suggestions = Vec::new();
        if available.contains(&primary) {
            suggestions.extend(queries.iter().map(|q| StrategySuggestion::new(primary, q)));
        }
        if let Some(most_specific) = queries.first() {
            suggestions.extend(
                available
                    .iter()
                    .filter(|id| **id != primary)
                    .map(|id| StrategySuggestion::new(id, most_specific)),
            );
        }
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(id: &str, cost: f64) -> ProviderCapability {
        ProviderCapability {
            provider_id: id.to_string(),
            cost_per_call: cost,
            supports_location_filter: true,
            supports_experience_filter: false,
            reliability_hint: 0.8,
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_variations_combine_role_and_skills() {
        let queries = KeywordAdvisor::query_variations(
            "AI Engineer",
            &keywords(&["ML Engineer", "Python", "Cloud", "Kubernetes"]),
        );
        assert_eq!(
            queries,
            vec!["ML Engineer Python Cloud", "ML Engineer Python", "ML Engineer"]
        );
    }

    #[test]
    fn test_variations_without_role_use_first_three_keywords() {
        let queries = KeywordAdvisor::query_variations(
            "Data Analyst",
            &keywords(&["SQL", "Tableau", "Excel", "Statistics"]),
        );
        assert_eq!(queries, vec!["SQL Tableau Excel"]);
    }

    #[test]
    fn test_variations_fall_back_to_title() {
        assert_eq!(
            KeywordAdvisor::query_variations("Product Manager", &[]),
            vec!["Product Manager"]
        );
    }

    #[test]
    fn test_routing_by_title() {
        assert_eq!(KeywordAdvisor::primary_provider("Federal IT Specialist"), USAJOBS_PROVIDER_ID);
        assert_eq!(KeywordAdvisor::primary_provider("Backend Engineer"), JSEARCH_PROVIDER_ID);
        assert_eq!(KeywordAdvisor::primary_provider("Technical Writer"), JSEARCH_PROVIDER_ID);
        assert_eq!(KeywordAdvisor::primary_provider("Nurse Practitioner"), ADZUNA_PROVIDER_ID);
    }

    #[tokio::test]
    async fn test_keyword_advisor_primary_gets_all_variations() {
        let request = AdvisorRequest {
            title: "Backend Engineer".to_string(),
            keywords: keywords(&["Software Engineer", "Python"]),
            providers: vec![
                capability(ADZUNA_PROVIDER_ID, 0.0),
                capability(JSEARCH_PROVIDER_ID, 0.005),
                capability(OFFLINE_PROVIDER_ID, 0.0),
            ],
        };
        let suggestions = KeywordAdvisor.suggest(&request).await.unwrap();
        let pairs: Vec<(&str, &str)> = suggestions
            .iter()
            .map(|s| (s.provider_id.as_str(), s.query.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (JSEARCH_PROVIDER_ID, "Software Engineer Python"),
                (JSEARCH_PROVIDER_ID, "Software Engineer"),
                (ADZUNA_PROVIDER_ID, "Software Engineer Python"),
            ]
        );
    }

    #[tokio::test]
    async fn test_keyword_advisor_skips_unavailable_primary() {
        let request = AdvisorRequest {
            title: "Federal Analyst".to_string(),
            keywords: vec![],
            providers: vec![capability(ADZUNA_PROVIDER_ID, 0.0)],
        };
        let suggestions = KeywordAdvisor.suggest(&request).await.unwrap();
        assert_eq!(suggestions, vec![StrategySuggestion::new(ADZUNA_PROVIDER_ID, "Federal Analyst")]);
    }

    #[test]
    fn test_planning_prompt_lists_live_providers_only() {
        let request = AdvisorRequest {
            title: "Data Engineer".to_string(),
            keywords: keywords(&["Spark", "Airflow"]),
            providers: vec![
                capability(JSEARCH_PROVIDER_ID, 0.005),
                capability(OFFLINE_PROVIDER_ID, 0.0),
            ],
        };
        let prompt = build_planning_prompt(&request);
        assert!(prompt.contains("Career path: Data Engineer"));
        assert!(prompt.contains("Spark, Airflow"));
        assert!(prompt.contains("- jsearch: $0.005/call"));
        assert!(!prompt.contains("- offline:"));
        assert!(!prompt.contains("{providers}"));
    }

    #[test]
    fn test_envelope_parses_fenced_llm_output() {
        let raw = "```json\n{\"strategies\": [{\"provider_id\": \"adzuna\", \"query\": \"Data Engineer\", \"estimated_cost\": 0.0}]}\n```";
        let envelope: SuggestionEnvelope = crate::llm_client::parse_json_text(raw).unwrap();
        assert_eq!(envelope.strategies.len(), 1);
        assert_eq!(envelope.strategies[0].provider_id, "adzuna");
    }
}
