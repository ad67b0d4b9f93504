//! SQLite implementation of the EventRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::models::{EventLevel, RunEvent, StageType};
use crate::domain::ports::{DatabaseError, EventRepository};

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn record(&self, event: &RunEvent) -> Result<(), DatabaseError> {
        let metadata = if event.metadata.is_null() {
            None
        } else {
            Some(serde_json::to_string(&event.metadata)?)
        };

        sqlx::query(
            r#"INSERT INTO run_events (project_id, pipeline_run_id, stage, level,
               event_type, message, metadata, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(event.project_id.to_string())
        .bind(event.pipeline_run_id.map(|id| id.to_string()))
        .bind(event.stage.map(|s| s.as_str()))
        .bind(event.level.as_str())
        .bind(&event.event_type)
        .bind(&event.message)
        .bind(metadata)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<RunEvent>, DatabaseError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM run_events WHERE project_id = ? ORDER BY id",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RunEvent::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    #[allow(dead_code)]
    id: i64,
    project_id: String,
    pipeline_run_id: Option<String>,
    stage: Option<String>,
    level: String,
    event_type: String,
    message: String,
    metadata: Option<String>,
    created_at: String,
}

impl TryFrom<EventRow> for RunEvent {
    type Error = DatabaseError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let level = match row.level.as_str() {
            "debug" => EventLevel::Debug,
            "info" => EventLevel::Info,
            "warn" => EventLevel::Warn,
            "error" => EventLevel::Error,
            other => return Err(DatabaseError::InvalidValue(format!("level: {other}"))),
        };

        let stage = row
            .stage
            .map(|s| {
                StageType::from_str(&s)
                    .ok_or_else(|| DatabaseError::InvalidValue(format!("stage: {s}")))
            })
            .transpose()?;

        Ok(RunEvent {
            project_id: Uuid::parse_str(&row.project_id)?,
            pipeline_run_id: row
                .pipeline_run_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()?,
            stage,
            level,
            event_type: row.event_type,
            message: row.message,
            metadata: row
                .metadata
                .map(|s| serde_json::from_str(&s))
                .transpose()?
                .unwrap_or(serde_json::Value::Null),
            created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)?
                .with_timezone(&chrono::Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};

    #[tokio::test]
    async fn record_and_list_events() {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        let repo = SqliteEventRepository::new(pool);

        let project_id = Uuid::new_v4();
        repo.record(
            &RunEvent::new(project_id, EventLevel::Info, "stage_started", "dispatching")
                .with_stage(StageType::LaborMarket),
        )
        .await
        .unwrap();
        repo.record(&RunEvent::new(
            project_id,
            EventLevel::Error,
            "stage_failed",
            "analyst unavailable",
        ))
        .await
        .unwrap();

        let events = repo.list_for_project(project_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].stage, Some(StageType::LaborMarket));
        assert_eq!(events[1].level, EventLevel::Error);
    }
}
