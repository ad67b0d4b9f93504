//! Research component persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{ResearchComponent, StageType};
use crate::domain::ports::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComponentRepository: Send + Sync {
    /// Insert a component. The (project, stage) pair is unique; inserting a
    /// duplicate is a constraint violation.
    async fn create(&self, component: &ResearchComponent) -> Result<(), DatabaseError>;

    async fn get(
        &self,
        project_id: Uuid,
        stage: StageType,
    ) -> Result<Option<ResearchComponent>, DatabaseError>;

    /// All components for a project, in registry stage order.
    async fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ResearchComponent>, DatabaseError>;

    /// Full-row update keyed by component id. A retried stage overwrites
    /// its prior result rather than appending.
    async fn update(&self, component: &ResearchComponent) -> Result<(), DatabaseError>;
}
