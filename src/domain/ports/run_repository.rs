//! Pipeline run persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::PipelineRun;
use crate::domain::ports::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert a run. The run identifier column carries a UNIQUE constraint;
    /// a collision surfaces as an error whose `is_unique_violation()` is
    /// true, never as a silent overwrite.
    async fn insert(&self, run: &PipelineRun) -> Result<(), DatabaseError>;

    /// Count stored run identifiers starting with `prefix` (the per-day
    /// sequence basis for the allocator).
    async fn count_run_id_prefix(&self, prefix: &str) -> Result<u32, DatabaseError>;

    /// Highest report version recorded for a project, 0 if none.
    async fn latest_version(&self, project_id: Uuid) -> Result<u32, DatabaseError>;

    /// Most recent run for a project, by version.
    async fn get_latest(&self, project_id: Uuid) -> Result<Option<PipelineRun>, DatabaseError>;

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PipelineRun>, DatabaseError>;
}
