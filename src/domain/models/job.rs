//! Run job domain model.
//!
//! A run job is one unit of deferred orchestration work: "advance this
//! project's pipeline by one bounded slice". Jobs make the pipeline
//! resumable across short-lived worker invocations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a queued run job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker
    Queued,
    /// Exclusively claimed by one worker
    Claimed,
    /// Slice processed successfully
    Done,
    /// Retries exhausted
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Claimed => "claimed",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "claimed" => Some(Self::Claimed),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Claimed)
    }
}

/// Kind of work a job represents. Closed set, stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Advance the project's pipeline by one slice
    Advance,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "advance" => Some(Self::Advance),
            _ => None,
        }
    }
}

/// One unit of deferred orchestration work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Not eligible for claiming before this instant (backoff)
    pub run_after: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunJob {
    pub fn advance(project_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            kind: JobKind::Advance,
            status: JobStatus::Queued,
            attempts: 0,
            last_error: None,
            run_after: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Backoff delay before the next attempt: base doubled per prior attempt.
    pub fn backoff_delay(&self, base_ms: u64) -> Duration {
        let factor = 2u64.saturating_pow(self.attempts.saturating_sub(1).min(16));
        Duration::milliseconds((base_ms.saturating_mul(factor)) as i64)
    }

    /// Whether the job is eligible for claiming at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Queued && self.run_after.is_none_or(|t| t <= now)
    }
}
