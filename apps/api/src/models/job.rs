use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Salary band normalized to annual amounts where the source allowed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// A job listing in the provider-independent shape every adapter produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub posted_date: Option<NaiveDate>,
    pub salary_range: Option<SalaryRange>,
    pub source_provider_id: String,
}

/// Identity of a listing across providers.
///
/// Two jobs with equal keys are the same posting no matter which provider
/// returned them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DedupKey {
    pub title: String,
    pub company: String,
    pub url: String,
}

impl DedupKey {
    /// Flat form used as the unique column in the `jobs` table.
    pub fn storage_key(&self) -> String {
        format!("{}|{}|{}", self.title, self.company, self.url)
    }
}

impl StandardizedJob {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            title: self.title.trim().to_lowercase(),
            company: self.company.trim().to_lowercase(),
            url: normalize_url(&self.url),
        }
    }
}

/// Drops query string and fragment, lower-cases scheme and host and trims a
/// trailing slash. Unparseable input is cut at the first `?` or `#`.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, company: &str, url: &str) -> StandardizedJob {
        StandardizedJob {
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            description: String::new(),
            url: url.to_string(),
            posted_date: None,
            salary_range: None,
            source_provider_id: "adzuna".to_string(),
        }
    }

    #[test]
    fn test_normalize_url_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("https://Jobs.Example.com/view/42?utm_source=x#apply"),
            "https://jobs.example.com/view/42"
        );
    }

    #[test]
    fn test_normalize_url_trims_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/jobs/7/"),
            "https://example.com/jobs/7"
        );
    }

    #[test]
    fn test_normalize_url_unparseable_input() {
        assert_eq!(normalize_url("jobs/7?ref=feed"), "jobs/7");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn test_dedup_key_ignores_case_and_tracking_params() {
        let a = job(
            "Senior Rust Engineer",
            "Acme",
            "https://acme.io/careers/1?src=jsearch",
        );
        let b = job(
            "senior rust engineer ",
            "ACME",
            "https://acme.io/careers/1?src=adzuna",
        );
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_dedup_key_differs_by_company() {
        let a = job("Data Analyst", "Acme", "https://x.io/1");
        let b = job("Data Analyst", "Globex", "https://x.io/1");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_storage_key_is_stable() {
        let key = job("Analyst", "Acme", "https://x.io/1?a=b").dedup_key();
        assert_eq!(key.storage_key(), "analyst|acme|https://x.io/1");
    }
}
