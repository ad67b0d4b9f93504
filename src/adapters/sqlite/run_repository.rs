//! SQLite implementation of the RunRepository.
//!
//! The UNIQUE constraint on run_id is the correctness backstop for the
//! count-then-insert identifier scheme: a collision fails the insert, it
//! never overwrites.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::models::PipelineRun;
use crate::domain::ports::{DatabaseError, RunRepository};

#[derive(Clone)]
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn insert(&self, run: &PipelineRun) -> Result<(), DatabaseError> {
        let config_json = serde_json::to_string(&run.config)?;
        let scores_json = serde_json::to_string(&run.stage_scores)?;

        sqlx::query(
            r#"INSERT INTO pipeline_runs (id, project_id, run_id, model, pipeline_version,
               config, stage_scores, composite_score, recommendation, report_markdown,
               report_hash, version, runtime_seconds, created_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(run.project_id.to_string())
        .bind(&run.run_id)
        .bind(&run.model)
        .bind(&run.pipeline_version)
        .bind(config_json)
        .bind(scores_json)
        .bind(run.composite_score)
        .bind(&run.recommendation)
        .bind(&run.report_markdown)
        .bind(&run.report_hash)
        .bind(run.version as i64)
        .bind(run.runtime_seconds)
        .bind(run.created_at.to_rfc3339())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::ConstraintViolation(format!("run_id taken: {}", run.run_id))
            }
            _ => DatabaseError::QueryFailed(e),
        })?;
        Ok(())
    }

    async fn count_run_id_prefix(&self, prefix: &str) -> Result<u32, DatabaseError> {
        let escaped = prefix.replace('%', "\\%").replace('_', "\\_");
        let (count,): (i64,) = sqlx::query_as(
            r"SELECT COUNT(*) FROM pipeline_runs WHERE run_id LIKE ? ESCAPE '\'",
        )
        .bind(format!("{escaped}%"))
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    async fn latest_version(&self, project_id: Uuid) -> Result<u32, DatabaseError> {
        let (version,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) FROM pipeline_runs WHERE project_id = ?",
        )
        .bind(project_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(version as u32)
    }

    async fn get_latest(&self, project_id: Uuid) -> Result<Option<PipelineRun>, DatabaseError> {
        let row: Option<RunRow> = sqlx::query_as(
            "SELECT * FROM pipeline_runs WHERE project_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PipelineRun::try_from).transpose()
    }

    async fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<PipelineRun>, DatabaseError> {
        let rows: Vec<RunRow> = sqlx::query_as(
            "SELECT * FROM pipeline_runs WHERE project_id = ? ORDER BY version",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PipelineRun::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    id: String,
    project_id: String,
    run_id: String,
    model: String,
    pipeline_version: String,
    config: Option<String>,
    stage_scores: Option<String>,
    composite_score: Option<f64>,
    recommendation: Option<String>,
    report_markdown: Option<String>,
    report_hash: Option<String>,
    version: i64,
    runtime_seconds: Option<f64>,
    created_at: String,
    completed_at: Option<String>,
}

impl TryFrom<RunRow> for PipelineRun {
    type Error = DatabaseError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let config = row
            .config
            .map(|s| serde_json::from_str(&s))
            .transpose()?
            .unwrap_or(serde_json::Value::Null);

        let stage_scores: BTreeMap<String, f64> = row
            .stage_scores
            .map(|s| serde_json::from_str(&s))
            .transpose()?
            .unwrap_or_default();

        let created_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)?
            .with_timezone(&chrono::Utc);
        let completed_at = row
            .completed_at
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&chrono::Utc))
            })
            .transpose()?;

        Ok(PipelineRun {
            id: Uuid::parse_str(&row.id)?,
            project_id: Uuid::parse_str(&row.project_id)?,
            run_id: row.run_id,
            model: row.model,
            pipeline_version: row.pipeline_version,
            config,
            stage_scores,
            composite_score: row.composite_score,
            recommendation: row.recommendation,
            report_markdown: row.report_markdown,
            report_hash: row.report_hash,
            version: row.version as u32,
            runtime_seconds: row.runtime_seconds,
            created_at,
            completed_at,
        })
    }
}
