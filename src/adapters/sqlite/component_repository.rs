//! SQLite implementation of the ComponentRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::models::{ComponentStatus, ResearchComponent, StageType};
use crate::domain::ports::{ComponentRepository, DatabaseError};

#[derive(Clone)]
pub struct SqliteComponentRepository {
    pool: SqlitePool,
}

impl SqliteComponentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComponentRepository for SqliteComponentRepository {
    async fn create(&self, component: &ResearchComponent) -> Result<(), DatabaseError> {
        let content_json = component
            .content
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO research_components (id, project_id, stage, status, content,
               markdown, score, error, attempts, created_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(component.id.to_string())
        .bind(component.project_id.to_string())
        .bind(component.stage.as_str())
        .bind(component.status.as_str())
        .bind(content_json)
        .bind(&component.markdown)
        .bind(component.score)
        .bind(&component.error)
        .bind(component.attempts as i32)
        .bind(component.created_at.to_rfc3339())
        .bind(component.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::ConstraintViolation(format!(
                    "component already exists for ({}, {})",
                    component.project_id, component.stage
                ))
            }
            _ => DatabaseError::QueryFailed(e),
        })?;
        Ok(())
    }

    async fn get(
        &self,
        project_id: Uuid,
        stage: StageType,
    ) -> Result<Option<ResearchComponent>, DatabaseError> {
        let row: Option<ComponentRow> = sqlx::query_as(
            "SELECT * FROM research_components WHERE project_id = ? AND stage = ?",
        )
        .bind(project_id.to_string())
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ResearchComponent::try_from).transpose()
    }

    async fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ResearchComponent>, DatabaseError> {
        let rows: Vec<ComponentRow> =
            sqlx::query_as("SELECT * FROM research_components WHERE project_id = ?")
                .bind(project_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        let mut components: Vec<ResearchComponent> = rows
            .into_iter()
            .map(ResearchComponent::try_from)
            .collect::<Result<_, _>>()?;

        // Registry order, so callers never re-sort
        components.sort_by_key(|c| {
            StageType::ALL.iter().position(|s| *s == c.stage).unwrap_or(usize::MAX)
        });
        Ok(components)
    }

    async fn update(&self, component: &ResearchComponent) -> Result<(), DatabaseError> {
        let content_json = component
            .content
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"UPDATE research_components SET status = ?, content = ?, markdown = ?,
               score = ?, error = ?, attempts = ?, completed_at = ?
               WHERE id = ?"#,
        )
        .bind(component.status.as_str())
        .bind(content_json)
        .bind(&component.markdown)
        .bind(component.score)
        .bind(&component.error)
        .bind(component.attempts as i32)
        .bind(component.completed_at.map(|t| t.to_rfc3339()))
        .bind(component.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::InvalidValue(format!(
                "component not found: {}",
                component.id
            )));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ComponentRow {
    id: String,
    project_id: String,
    stage: String,
    status: String,
    content: Option<String>,
    markdown: Option<String>,
    score: Option<f64>,
    error: Option<String>,
    attempts: i32,
    created_at: String,
    completed_at: Option<String>,
}

impl TryFrom<ComponentRow> for ResearchComponent {
    type Error = DatabaseError;

    fn try_from(row: ComponentRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)?;
        let project_id = Uuid::parse_str(&row.project_id)?;

        let stage = StageType::from_str(&row.stage)
            .ok_or_else(|| DatabaseError::InvalidValue(format!("stage: {}", row.stage)))?;
        let status = ComponentStatus::from_str(&row.status)
            .ok_or_else(|| DatabaseError::InvalidValue(format!("status: {}", row.status)))?;

        let content = row
            .content
            .map(|s| serde_json::from_str(&s))
            .transpose()?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)?
            .with_timezone(&chrono::Utc);
        let completed_at = row
            .completed_at
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&chrono::Utc))
            })
            .transpose()?;

        Ok(ResearchComponent {
            id,
            project_id,
            stage,
            status,
            content,
            markdown: row.markdown,
            score: row.score,
            error: row.error,
            attempts: row.attempts as u32,
            created_at,
            completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
    use crate::domain::models::{ProgramBrief, Project, StageOutput};
    use crate::domain::ports::ProjectRepository;
    use serde_json::json;

    async fn setup() -> (SqliteComponentRepository, Uuid) {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();

        let project = Project::new(ProgramBrief {
            name: "Welding Technology".to_string(),
            ..Default::default()
        });
        crate::adapters::sqlite::SqliteProjectRepository::new(pool.clone())
            .create(&project)
            .await
            .unwrap();

        (SqliteComponentRepository::new(pool), project.id)
    }

    #[tokio::test]
    async fn create_and_get_component() {
        let (repo, project_id) = setup().await;
        let component = ResearchComponent::new(project_id, StageType::LaborMarket);

        repo.create(&component).await.unwrap();

        let retrieved = repo.get(project_id, StageType::LaborMarket).await.unwrap().unwrap();
        assert_eq!(retrieved.stage, StageType::LaborMarket);
        assert_eq!(retrieved.status, ComponentStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_stage_is_rejected() {
        let (repo, project_id) = setup().await;
        repo.create(&ResearchComponent::new(project_id, StageType::LaborMarket))
            .await
            .unwrap();

        let err = repo
            .create(&ResearchComponent::new(project_id, StageType::LaborMarket))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn update_overwrites_result() {
        let (repo, project_id) = setup().await;
        let mut component = ResearchComponent::new(project_id, StageType::FinancialViability);
        repo.create(&component).await.unwrap();

        component.complete(StageOutput {
            content: json!({"breakeven_enrollment": 18}),
            markdown: "## Financial Viability\n\nBreakeven at 18.".to_string(),
            score: Some(6.5),
        });
        repo.update(&component).await.unwrap();

        let retrieved = repo
            .get(project_id, StageType::FinancialViability)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.status, ComponentStatus::Completed);
        assert_eq!(retrieved.score, Some(6.5));
        assert_eq!(retrieved.content, Some(json!({"breakeven_enrollment": 18})));
    }

    #[tokio::test]
    async fn list_returns_registry_order() {
        let (repo, project_id) = setup().await;
        // Insert out of order
        repo.create(&ResearchComponent::new(project_id, StageType::QaReview))
            .await
            .unwrap();
        repo.create(&ResearchComponent::new(project_id, StageType::LaborMarket))
            .await
            .unwrap();
        repo.create(&ResearchComponent::new(project_id, StageType::EmployerDemand))
            .await
            .unwrap();

        let components = repo.list_for_project(project_id).await.unwrap();
        let stages: Vec<StageType> = components.iter().map(|c| c.stage).collect();
        assert_eq!(
            stages,
            vec![StageType::LaborMarket, StageType::EmployerDemand, StageType::QaReview]
        );
    }
}
