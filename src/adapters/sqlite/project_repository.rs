//! SQLite implementation of the ProjectRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::models::{ProgramBrief, Project, ProjectStatus};
use crate::domain::ports::{DatabaseError, ProjectRepository};

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: &Project) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO projects (id, program_name, program_type, target_audience,
               constraints, status, archived, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(project.id.to_string())
        .bind(&project.brief.name)
        .bind(&project.brief.program_type)
        .bind(&project.brief.audience)
        .bind(&project.brief.constraints)
        .bind(project.status.as_str())
        .bind(i32::from(project.archived))
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Project::try_from).transpose()
    }

    async fn update(&self, project: &Project) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"UPDATE projects SET program_name = ?, program_type = ?, target_audience = ?,
               constraints = ?, status = ?, archived = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&project.brief.name)
        .bind(&project.brief.program_type)
        .bind(&project.brief.audience)
        .bind(&project.brief.constraints)
        .bind(project.status.as_str())
        .bind(i32::from(project.archived))
        .bind(project.updated_at.to_rfc3339())
        .bind(project.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::ProjectNotFound(project.id));
        }
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<Project>, DatabaseError> {
        let query = if include_archived {
            "SELECT * FROM projects ORDER BY created_at DESC"
        } else {
            "SELECT * FROM projects WHERE archived = 0 ORDER BY created_at DESC"
        };

        let rows: Vec<ProjectRow> = sqlx::query_as(query).fetch_all(&self.pool).await?;
        rows.into_iter().map(Project::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    program_name: String,
    program_type: Option<String>,
    target_audience: Option<String>,
    constraints: Option<String>,
    status: String,
    archived: i32,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DatabaseError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)?;

        let status = ProjectStatus::from_str(&row.status)
            .ok_or_else(|| DatabaseError::InvalidValue(format!("status: {}", row.status)))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)?
            .with_timezone(&chrono::Utc);
        let updated_at = chrono::DateTime::parse_from_rfc3339(&row.updated_at)?
            .with_timezone(&chrono::Utc);

        Ok(Project {
            id,
            brief: ProgramBrief {
                name: row.program_name,
                program_type: row.program_type,
                audience: row.target_audience,
                constraints: row.constraints,
            },
            status,
            archived: row.archived != 0,
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};

    async fn setup_test_repo() -> SqliteProjectRepository {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        SqliteProjectRepository::new(pool)
    }

    fn sample_project() -> Project {
        Project::new(ProgramBrief {
            name: "Industrial Maintenance Certificate".to_string(),
            program_type: Some("non-credit certificate".to_string()),
            audience: Some("adult career changers".to_string()),
            constraints: None,
        })
    }

    #[tokio::test]
    async fn create_and_get_project() {
        let repo = setup_test_repo().await;
        let project = sample_project();

        repo.create(&project).await.unwrap();

        let retrieved = repo.get(project.id).await.unwrap().unwrap();
        assert_eq!(retrieved.brief.name, "Industrial Maintenance Certificate");
        assert_eq!(retrieved.status, ProjectStatus::Intake);
    }

    #[tokio::test]
    async fn update_persists_status_change() {
        let repo = setup_test_repo().await;
        let mut project = sample_project();
        repo.create(&project).await.unwrap();

        project.transition_to(ProjectStatus::Researching).unwrap();
        repo.update(&project).await.unwrap();

        let retrieved = repo.get(project.id).await.unwrap().unwrap();
        assert_eq!(retrieved.status, ProjectStatus::Researching);
    }

    #[tokio::test]
    async fn update_missing_project_errors() {
        let repo = setup_test_repo().await;
        let project = sample_project();
        assert!(matches!(
            repo.update(&project).await,
            Err(DatabaseError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_skips_archived_by_default() {
        let repo = setup_test_repo().await;
        let mut archived = sample_project();
        archived.archived = true;
        let active = sample_project();

        repo.create(&archived).await.unwrap();
        repo.create(&active).await.unwrap();

        assert_eq!(repo.list(false).await.unwrap().len(), 1);
        assert_eq!(repo.list(true).await.unwrap().len(), 2);
    }
}
