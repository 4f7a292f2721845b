use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::search::executor::ExecutorConfig;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Absent → the keyword advisor plans searches instead of Gemini.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub usajobs: Option<UsaJobsCredentials>,
    pub jsearch: Option<JSearchCredentials>,
    pub adzuna: Option<AdzunaCredentials>,
    pub search: SearchSettings,
}

#[derive(Debug, Clone)]
pub struct UsaJobsCredentials {
    pub api_key: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct JSearchCredentials {
    pub api_key: String,
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct AdzunaCredentials {
    pub app_id: String,
    pub app_key: String,
    pub country: String,
}

/// Session defaults; every field has a `SEARCH_*` override.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Dollars per session when the request does not name a budget.
    pub budget_ceiling: f64,
    pub max_in_flight: usize,
    pub call_timeout_secs: u64,
    pub deadline_secs: u64,
    pub backoff_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            budget_ceiling: 0.20,
            max_in_flight: 4,
            call_timeout_secs: 10,
            deadline_secs: 25,
            backoff_ms: 500,
        }
    }
}

impl SearchSettings {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_in_flight: self.max_in_flight.max(1),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            deadline: Duration::from_secs(self.deadline_secs),
            backoff_base: Duration::from_millis(self.backoff_ms),
        }
    }

    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            budget_ceiling: parse_env("SEARCH_BUDGET_CEILING", defaults.budget_ceiling)?,
            max_in_flight: parse_env("SEARCH_MAX_IN_FLIGHT", defaults.max_in_flight)?,
            call_timeout_secs: parse_env("SEARCH_CALL_TIMEOUT_SECS", defaults.call_timeout_secs)?,
            deadline_secs: parse_env("SEARCH_DEADLINE_SECS", defaults.deadline_secs)?,
            backoff_ms: parse_env("SEARCH_BACKOFF_MS", defaults.backoff_ms)?,
        };
        if !settings.budget_ceiling.is_finite() || settings.budget_ceiling < 0.0 {
            anyhow::bail!("SEARCH_BUDGET_CEILING must be a non-negative number");
        }
        Ok(settings)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let usajobs = match (optional_env("USAJOBS_API_KEY"), optional_env("USAJOBS_USER_AGENT")) {
            (Some(api_key), Some(user_agent)) => Some(UsaJobsCredentials {
                api_key,
                user_agent,
            }),
            _ => None,
        };
        let jsearch = optional_env("JSEARCH_API_KEY").map(|api_key| JSearchCredentials {
            api_key,
            host: optional_env("JSEARCH_API_HOST")
                .unwrap_or_else(|| "jsearch.p.rapidapi.com".to_string()),
        });
        let adzuna = match (optional_env("ADZUNA_APP_ID"), optional_env("ADZUNA_APP_KEY")) {
            (Some(app_id), Some(app_key)) => Some(AdzunaCredentials {
                app_id,
                app_key,
                country: optional_env("ADZUNA_COUNTRY").unwrap_or_else(|| "gb".to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: optional_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            usajobs,
            jsearch,
            adzuna,
            search: SearchSettings::from_env()?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_value(key, optional_env(key).as_deref(), default)
}

fn parse_value<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
