//! Job Store: "store or update job record", keyed by the composite dedup key.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::job::StandardizedJob;

pub const STATUS_NEW: &str = "new";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredJob {
    pub job_id: Uuid,
    /// False when an existing record was updated.
    pub created: bool,
}

/// Persistence sink for jobs. Carried in `AppState` as `Arc<dyn JobStore>`.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn upsert(
        &self,
        job: &StandardizedJob,
        status: &str,
        career_path: Option<&str>,
    ) -> Result<StoredJob, sqlx::Error>;
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    /// Existing rows keep their status, creation time and first career path;
    /// listing fields are refreshed.
    async fn upsert(
        &self,
        job: &StandardizedJob,
        status: &str,
        career_path: Option<&str>,
    ) -> Result<StoredJob, sqlx::Error> {
        let salary = job.salary_range.as_ref();

        sqlx::query_as::<_, StoredJob>(
            r#"
            INSERT INTO jobs
                (id, dedup_key, title, company, location, description, url, posted_date,
                 salary_min, salary_max, salary_currency, source, career_path, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (dedup_key) DO UPDATE SET
                location        = EXCLUDED.location,
                description     = EXCLUDED.description,
                url             = EXCLUDED.url,
                posted_date     = COALESCE(EXCLUDED.posted_date, jobs.posted_date),
                salary_min      = COALESCE(EXCLUDED.salary_min, jobs.salary_min),
                salary_max      = COALESCE(EXCLUDED.salary_max, jobs.salary_max),
                salary_currency = COALESCE(EXCLUDED.salary_currency, jobs.salary_currency),
                source          = EXCLUDED.source,
                career_path     = COALESCE(jobs.career_path, EXCLUDED.career_path),
                updated_at      = NOW()
            RETURNING id AS job_id, (xmax = 0) AS created
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.dedup_key().storage_key())
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.url)
        .bind(job.posted_date)
        .bind(salary.map(|s| s.min))
        .bind(salary.map(|s| s.max))
        .bind(salary.map(|s| s.currency.as_str()))
        .bind(&job.source_provider_id)
        .bind(career_path)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }
}

/// In-memory store for handler tests.
#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    struct MemoryRow {
        id: Uuid,
        status: String,
        career_path: Option<String>,
    }

    /// Mirrors the conflict rules of `PgJobStore::upsert`.
    #[derive(Default)]
    pub struct MemoryJobStore {
        rows: Mutex<HashMap<String, MemoryRow>>,
    }

    impl MemoryJobStore {
        pub fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn status_of(&self, job: &StandardizedJob) -> Option<String> {
            self.rows
                .lock()
                .unwrap()
                .get(&job.dedup_key().storage_key())
                .map(|row| row.status.clone())
        }

        pub fn career_path_of(&self, job: &StandardizedJob) -> Option<String> {
            self.rows
                .lock()
                .unwrap()
                .get(&job.dedup_key().storage_key())
                .and_then(|row| row.career_path.clone())
        }
    }

    #[async_trait]
    impl JobStore for MemoryJobStore {
        async fn upsert(
            &self,
            job: &StandardizedJob,
            status: &str,
            career_path: Option<&str>,
        ) -> Result<StoredJob, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let key = job.dedup_key().storage_key();
            if let Some(row) = rows.get_mut(&key) {
                if row.career_path.is_none() {
                    row.career_path = career_path.map(str::to_string);
                }
                return Ok(StoredJob {
                    job_id: row.id,
                    created: false,
                });
            }
            let id = Uuid::new_v4();
            rows.insert(
                key,
                MemoryRow {
                    id,
                    status: status.to_string(),
                    career_path: career_path.map(str::to_string),
                },
            );
            Ok(StoredJob {
                job_id: id,
                created: true,
            })
        }
    }

    #[tokio::test]
    async fn test_memory_store_upserts_by_dedup_key() {
        let store = MemoryJobStore::default();
        let mut job = StandardizedJob {
            title: "Rust Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: String::new(),
            url: "https://acme.io/1?ref=a".to_string(),
            posted_date: None,
            salary_range: None,
            source_provider_id: "jsearch".to_string(),
        };
        let first = store.upsert(&job, STATUS_NEW, None).await.unwrap();
        job.url = "https://acme.io/1?ref=b".to_string();
        let second = store.upsert(&job, "applied", None).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.job_id, second.job_id);
        assert_eq!(store.count(), 1);
        assert_eq!(store.status_of(&job).as_deref(), Some(STATUS_NEW));
    }
}
