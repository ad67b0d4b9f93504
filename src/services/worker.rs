//! Job queue worker.
//!
//! One invocation claims and processes exactly one queued job, then
//! returns. Claiming is a compare-and-set on the job's status; losing the
//! race is a normal outcome, not an error. A slice that fails is requeued
//! with exponential backoff until the job's attempt budget runs out.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::{EventLevel, JobStatus, RunEvent, RunJob};
use crate::domain::ports::JobRepository;
use crate::services::orchestrator::{AdvanceOutcome, PipelineOrchestrator};
use crate::services::telemetry::Telemetry;

/// What one worker invocation did.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// No queued job was due
    Idle,
    /// Another worker claimed the job first
    ClaimLost { job_id: Uuid },
    /// Slice processed; job done
    Processed {
        job_id: Uuid,
        project_id: Uuid,
        advance: AdvanceOutcome,
    },
    /// Slice failed; job requeued with backoff
    Retried {
        job_id: Uuid,
        attempt: u32,
        error: String,
    },
    /// Slice failed and the job's attempt budget is spent
    Exhausted { job_id: Uuid, error: String },
}

pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    orchestrator: Arc<PipelineOrchestrator>,
    telemetry: Telemetry,
    max_job_attempts: u32,
    backoff_base_ms: u64,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        orchestrator: Arc<PipelineOrchestrator>,
        telemetry: Telemetry,
        max_job_attempts: u32,
        backoff_base_ms: u64,
    ) -> Self {
        Self {
            jobs,
            orchestrator,
            telemetry,
            max_job_attempts,
            backoff_base_ms,
        }
    }

    /// Enqueue an advancement job for a project, idempotently: if the
    /// project already has an active job, that job is returned instead.
    pub async fn enqueue_advance(&self, project_id: Uuid) -> Result<RunJob> {
        if let Some(active) = self
            .jobs
            .active_for_project(project_id)
            .await
            .context("Failed to check for active job")?
        {
            return Ok(active);
        }

        let job = RunJob::advance(project_id);
        self.jobs
            .enqueue(&job)
            .await
            .context("Failed to enqueue job")?;
        info!(job_id = %job.id, %project_id, "advancement job enqueued");
        Ok(job)
    }

    /// Claim and process the oldest due job, if any.
    #[instrument(skip(self))]
    pub async fn process_next(&self) -> Result<WorkerOutcome> {
        let Some(job) = self
            .jobs
            .next_due(Utc::now())
            .await
            .context("Failed to poll job queue")?
        else {
            return Ok(WorkerOutcome::Idle);
        };
        self.process_job(job).await
    }

    /// Claim and process a specific project's active job, if due.
    pub async fn process_project(&self, project_id: Uuid) -> Result<WorkerOutcome> {
        let Some(job) = self
            .jobs
            .active_for_project(project_id)
            .await
            .context("Failed to look up project job")?
        else {
            return Ok(WorkerOutcome::Idle);
        };
        if !job.is_due(Utc::now()) {
            return Ok(WorkerOutcome::Idle);
        }
        self.process_job(job).await
    }

    async fn process_job(&self, mut job: RunJob) -> Result<WorkerOutcome> {
        let claimed = self
            .jobs
            .claim(job.id)
            .await
            .context("Failed to claim job")?;
        if !claimed {
            return Ok(WorkerOutcome::ClaimLost { job_id: job.id });
        }

        job.status = JobStatus::Claimed;
        job.attempts += 1;
        job.started_at = Some(Utc::now());
        self.jobs
            .update(&job)
            .await
            .context("Failed to record job start")?;

        match self.orchestrator.advance(job.project_id).await {
            Ok(advance) => {
                job.status = JobStatus::Done;
                job.finished_at = Some(Utc::now());
                self.jobs
                    .update(&job)
                    .await
                    .context("Failed to mark job done")?;

                if advance.needs_follow_up() {
                    self.enqueue_advance(job.project_id).await?;
                }

                Ok(WorkerOutcome::Processed {
                    job_id: job.id,
                    project_id: job.project_id,
                    advance,
                })
            }
            Err(err) => self.handle_failure(job, &err).await,
        }
    }

    async fn handle_failure(&self, mut job: RunJob, err: &anyhow::Error) -> Result<WorkerOutcome> {
        let error = format!("{err:#}");
        job.last_error = Some(error.clone());

        if job.attempts >= self.max_job_attempts {
            warn!(job_id = %job.id, attempts = job.attempts, %error, "job attempts exhausted");
            job.status = JobStatus::Failed;
            job.finished_at = Some(Utc::now());
            self.jobs
                .update(&job)
                .await
                .context("Failed to mark job failed")?;

            self.telemetry
                .record(
                    RunEvent::new(
                        job.project_id,
                        EventLevel::Error,
                        "job_failed",
                        format!("Advancement job gave up after {} attempts", job.attempts),
                    )
                    .with_metadata(serde_json::json!({ "job_id": job.id, "error": error })),
                )
                .await;

            return Ok(WorkerOutcome::Exhausted {
                job_id: job.id,
                error,
            });
        }

        let delay = job.backoff_delay(self.backoff_base_ms);
        job.status = JobStatus::Queued;
        job.run_after = Some(Utc::now() + delay);
        self.jobs
            .update(&job)
            .await
            .context("Failed to requeue job")?;
        warn!(
            job_id = %job.id,
            attempt = job.attempts,
            delay_ms = delay.num_milliseconds(),
            %error,
            "slice failed, job requeued"
        );

        Ok(WorkerOutcome::Retried {
            job_id: job.id,
            attempt: job.attempts,
            error,
        })
    }
}
