//! SQLite implementation of the JobRepository.
//!
//! The claim is a guarded UPDATE: `status = 'claimed' WHERE id = ? AND
//! status = 'queued'`. rows_affected tells the worker whether it won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::models::{JobKind, JobStatus, RunJob};
use crate::domain::ports::{DatabaseError, JobRepository};

#[derive(Clone)]
pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn enqueue(&self, job: &RunJob) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO run_jobs (id, project_id, kind, status, attempts, last_error,
               run_after, created_at, started_at, finished_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(job.id.to_string())
        .bind(job.project_id.to_string())
        .bind(job.kind.as_str())
        .bind(job.status.as_str())
        .bind(job.attempts as i32)
        .bind(&job.last_error)
        .bind(job.run_after.map(|t| t.to_rfc3339()))
        .bind(job.created_at.to_rfc3339())
        .bind(job.started_at.map(|t| t.to_rfc3339()))
        .bind(job.finished_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RunJob>, DatabaseError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM run_jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(RunJob::try_from).transpose()
    }

    async fn next_due(&self, now: DateTime<Utc>) -> Result<Option<RunJob>, DatabaseError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"SELECT * FROM run_jobs
               WHERE status = 'queued' AND (run_after IS NULL OR run_after <= ?)
               ORDER BY created_at
               LIMIT 1"#,
        )
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RunJob::try_from).transpose()
    }

    async fn claim(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"UPDATE run_jobs SET status = 'claimed', started_at = ?
               WHERE id = ? AND status = 'queued'"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn active_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Option<RunJob>, DatabaseError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"SELECT * FROM run_jobs
               WHERE project_id = ? AND status IN ('queued', 'claimed')
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RunJob::try_from).transpose()
    }

    async fn update(&self, job: &RunJob) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"UPDATE run_jobs SET status = ?, attempts = ?, last_error = ?,
               run_after = ?, started_at = ?, finished_at = ?
               WHERE id = ?"#,
        )
        .bind(job.status.as_str())
        .bind(job.attempts as i32)
        .bind(&job.last_error)
        .bind(job.run_after.map(|t| t.to_rfc3339()))
        .bind(job.started_at.map(|t| t.to_rfc3339()))
        .bind(job.finished_at.map(|t| t.to_rfc3339()))
        .bind(job.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::JobNotFound(job.id));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    project_id: String,
    kind: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    run_after: Option<String>,
    created_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
}

impl TryFrom<JobRow> for RunJob {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let parse_ts = |s: String| -> Result<DateTime<Utc>, DatabaseError> {
            Ok(chrono::DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc))
        };

        Ok(RunJob {
            id: Uuid::parse_str(&row.id)?,
            project_id: Uuid::parse_str(&row.project_id)?,
            kind: JobKind::from_str(&row.kind)
                .ok_or_else(|| DatabaseError::InvalidValue(format!("kind: {}", row.kind)))?,
            status: JobStatus::from_str(&row.status)
                .ok_or_else(|| DatabaseError::InvalidValue(format!("status: {}", row.status)))?,
            attempts: row.attempts as u32,
            last_error: row.last_error,
            run_after: row.run_after.map(parse_ts).transpose()?,
            created_at: parse_ts(row.created_at)?,
            started_at: row.started_at.map(parse_ts).transpose()?,
            finished_at: row.finished_at.map(parse_ts).transpose()?,
        })
    }
}
