//! Run event telemetry port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::RunEvent;
use crate::domain::ports::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn record(&self, event: &RunEvent) -> Result<(), DatabaseError>;

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<RunEvent>, DatabaseError>;
}
