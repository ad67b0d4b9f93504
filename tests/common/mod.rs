//! Shared wiring for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use wavelength::adapters::sqlite::{
    all_embedded_migrations, create_test_pool, Migrator, SqliteComponentRepository,
    SqliteEventRepository, SqliteJobRepository, SqliteProjectRepository, SqliteRunRepository,
};
use wavelength::adapters::FixtureAnalyst;
use wavelength::domain::models::{PipelineConfig, ProgramBrief};
use wavelength::domain::ports::{
    ComponentRepository, EventRepository, JobRepository, ProjectRepository, RunRepository,
};
use wavelength::services::{
    JobWorker, PipelineOrchestrator, ProjectService, RunIdAllocator, StageRunner, Telemetry,
};
use wavelength::Project;

pub struct TestHarness {
    pub pool: sqlx::SqlitePool,
    pub service: ProjectService,
    pub worker: JobWorker,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub projects: Arc<dyn ProjectRepository>,
    pub components: Arc<dyn ComponentRepository>,
    pub runs: Arc<dyn RunRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub events: Arc<dyn EventRepository>,
}

pub async fn harness(analyst: FixtureAnalyst) -> TestHarness {
    harness_with_config(analyst, PipelineConfig::default()).await
}

pub async fn harness_with_config(
    analyst: FixtureAnalyst,
    config: PipelineConfig,
) -> TestHarness {
    let pool = create_test_pool().await.expect("test pool");
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .expect("migrations");

    let projects: Arc<dyn ProjectRepository> = Arc::new(SqliteProjectRepository::new(pool.clone()));
    let components: Arc<dyn ComponentRepository> =
        Arc::new(SqliteComponentRepository::new(pool.clone()));
    let runs: Arc<dyn RunRepository> = Arc::new(SqliteRunRepository::new(pool.clone()));
    let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool.clone()));
    let events: Arc<dyn EventRepository> = Arc::new(SqliteEventRepository::new(pool.clone()));
    let telemetry = Telemetry::new(events.clone());

    let stage_runner = StageRunner::new(
        components.clone(),
        Arc::new(analyst),
        telemetry.clone(),
        Duration::from_secs(config.stage_timeout_secs),
    );
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        projects.clone(),
        components.clone(),
        runs.clone(),
        stage_runner,
        RunIdAllocator::new(runs.clone()),
        telemetry.clone(),
        config.clone(),
    ));

    let worker = JobWorker::new(
        jobs.clone(),
        orchestrator.clone(),
        telemetry,
        config.max_job_attempts,
        config.job_backoff_base_ms,
    );

    let service = ProjectService::new(
        projects.clone(),
        components.clone(),
        jobs.clone(),
        runs.clone(),
    );

    TestHarness {
        pool,
        service,
        worker,
        orchestrator,
        projects,
        components,
        runs,
        jobs,
        events,
    }
}

pub fn brief(name: &str) -> ProgramBrief {
    ProgramBrief {
        name: name.to_string(),
        program_type: Some("non-credit certificate".to_string()),
        audience: Some("adult career changers".to_string()),
        constraints: None,
    }
}

/// Overwrite a project's stored status with a value no repository can
/// parse, so every subsequent slice for it fails at load time.
pub async fn corrupt_project_status(harness: &TestHarness, project: &Project) {
    sqlx::query("UPDATE projects SET status = 'shelved' WHERE id = ?")
        .bind(project.id.to_string())
        .execute(&harness.pool)
        .await
        .expect("corrupt project row");
}

/// Submit a project and pump the worker until the queue drains.
pub async fn submit_and_drain(harness: &TestHarness, name: &str) -> Project {
    let project = harness
        .service
        .create_project(brief(name))
        .await
        .expect("create project");
    drain(&harness.worker).await;
    project
}

/// Process jobs until the queue is idle. Panics if it never settles.
pub async fn drain(worker: &JobWorker) {
    for _ in 0..40 {
        if matches!(
            worker.process_next().await.expect("process job"),
            wavelength::WorkerOutcome::Idle
        ) {
            return;
        }
    }
    panic!("job queue did not drain in 40 steps");
}
