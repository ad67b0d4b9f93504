//! Run job queue port.
//!
//! The claim operation is the queue's sole mutual-exclusion mechanism: a
//! compare-and-set on the job's status that exactly one worker can win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::RunJob;
use crate::domain::ports::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn enqueue(&self, job: &RunJob) -> Result<(), DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<RunJob>, DatabaseError>;

    /// Oldest queued job whose `run_after` has elapsed, if any.
    async fn next_due(&self, now: DateTime<Utc>) -> Result<Option<RunJob>, DatabaseError>;

    /// Atomically claim a queued job. Returns false when another worker won
    /// the race (the guarded UPDATE matched zero rows).
    async fn claim(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Active (queued or claimed) job for a project, used to keep enqueue
    /// idempotent: one advancement job per project at a time.
    async fn active_for_project(&self, project_id: Uuid)
        -> Result<Option<RunJob>, DatabaseError>;

    async fn update(&self, job: &RunJob) -> Result<(), DatabaseError>;
}
