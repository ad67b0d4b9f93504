//! Project persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::Project;
use crate::domain::ports::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<(), DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;

    /// Full-row update; errors if the project does not exist.
    async fn update(&self, project: &Project) -> Result<(), DatabaseError>;

    async fn list(&self, include_archived: bool) -> Result<Vec<Project>, DatabaseError>;
}
