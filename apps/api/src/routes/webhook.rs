use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::StandardizedJob;
use crate::providers::normalize::{parse_posted_date, parse_salary_text};
use crate::state::AppState;
use crate::store::STATUS_NEW;

const DEFAULT_WEBHOOK_SOURCE: &str = "webhook";

/// A listing pushed by an external scraper or automation.
#[derive(Debug, Deserialize)]
pub struct NewJobPayload {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Free text such as "$120k - $150k" or "£40,000 per year".
    #[serde(default)]
    pub salary: Option<String>,
    /// ISO date or relative text ("3 days ago").
    #[serde(default)]
    pub posted_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewJobResponse {
    pub job_id: Uuid,
    pub created: bool,
    pub status: &'static str,
}

impl NewJobPayload {
    fn into_job(self) -> Result<StandardizedJob, AppError> {
        let title = self.title.trim().to_string();
        let company = self.company.trim().to_string();
        if title.is_empty() || company.is_empty() {
            return Err(AppError::Validation(
                "title and company are required".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let location = self.location.trim();

        Ok(StandardizedJob {
            title,
            company,
            location: if location.is_empty() {
                "Not specified".to_string()
            } else {
                location.to_string()
            },
            description: self.description,
            url: self.url.trim().to_string(),
            posted_date: self
                .posted_date
                .as_deref()
                .and_then(|raw| parse_posted_date(raw, today)),
            salary_range: self.salary.as_deref().and_then(parse_salary_text),
            source_provider_id: self
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_WEBHOOK_SOURCE.to_string()),
        })
    }
}

/// POST /webhook/new-job
pub async fn handle_new_job(
    State(state): State<AppState>,
    Json(payload): Json<NewJobPayload>,
) -> Result<(StatusCode, Json<NewJobResponse>), AppError> {
    let job = payload.into_job()?;
    let stored = state.store.upsert(&job, STATUS_NEW, None).await?;

    info!(
        "Webhook job '{}' at {} stored (created: {})",
        job.title, job.company, stored.created
    );

    let status = if stored.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(NewJobResponse {
            job_id: stored.job_id,
            created: stored.created,
            status: STATUS_NEW,
        }),
    ))
}
