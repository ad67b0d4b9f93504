//! Shared wiring for CLI commands: configuration, pool, and services.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    all_embedded_migrations, open_pool, verify_connection, Migrator, SqliteComponentRepository,
    SqliteEventRepository, SqliteJobRepository, SqliteProjectRepository, SqliteRunRepository,
};
use crate::adapters::FixtureAnalyst;
use crate::domain::models::Config;
use crate::domain::ports::{
    ComponentRepository, JobRepository, ProjectRepository, RunRepository,
};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    JobWorker, PipelineOrchestrator, ProjectService, RunIdAllocator, StageRunner, Telemetry,
};

pub struct AppContext {
    pub config: Config,
    pool: SqlitePool,
}

impl AppContext {
    /// Load configuration and open the project-local database. Fails with
    /// a pointer at `init` when the store does not exist yet.
    pub async fn init() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let pool = open_database(&config).await?;
        Ok(Self { config, pool })
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(
            Arc::new(SqliteProjectRepository::new(self.pool.clone())),
            Arc::new(SqliteComponentRepository::new(self.pool.clone())),
            Arc::new(SqliteJobRepository::new(self.pool.clone())),
            Arc::new(SqliteRunRepository::new(self.pool.clone())),
        )
    }

    pub fn worker(&self) -> JobWorker {
        let projects: Arc<dyn ProjectRepository> =
            Arc::new(SqliteProjectRepository::new(self.pool.clone()));
        let components: Arc<dyn ComponentRepository> =
            Arc::new(SqliteComponentRepository::new(self.pool.clone()));
        let runs: Arc<dyn RunRepository> = Arc::new(SqliteRunRepository::new(self.pool.clone()));
        let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(self.pool.clone()));
        let telemetry = Telemetry::new(Arc::new(SqliteEventRepository::new(self.pool.clone())));

        let stage_runner = StageRunner::new(
            components.clone(),
            Arc::new(FixtureAnalyst::new()),
            telemetry.clone(),
            Duration::from_secs(self.config.pipeline.stage_timeout_secs),
        );
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            projects,
            components,
            runs.clone(),
            stage_runner,
            RunIdAllocator::new(runs),
            telemetry.clone(),
            self.config.pipeline.clone(),
        ));

        JobWorker::new(
            jobs,
            orchestrator,
            telemetry,
            self.config.pipeline.max_job_attempts,
            self.config.pipeline.job_backoff_base_ms,
        )
    }
}

/// Open the configured database and bring the schema up to date.
pub async fn open_database(config: &Config) -> Result<SqlitePool> {
    let pool = open_pool(&config.database.path, config.database.max_connections)
        .await
        .context("Failed to open database. Run 'wavelength init' first.")?;

    verify_connection(&pool)
        .await
        .context("Database connection check failed")?;

    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
