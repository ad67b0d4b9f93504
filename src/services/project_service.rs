//! Project intake and operator actions.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::models::{
    PipelineRun, ProgramBrief, Project, ResearchComponent, RunJob, StageType,
};
use crate::domain::ports::{
    ComponentRepository, JobRepository, ProjectRepository, RunRepository,
};

pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    components: Arc<dyn ComponentRepository>,
    jobs: Arc<dyn JobRepository>,
    runs: Arc<dyn RunRepository>,
}

impl ProjectService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        components: Arc<dyn ComponentRepository>,
        jobs: Arc<dyn JobRepository>,
        runs: Arc<dyn RunRepository>,
    ) -> Self {
        Self {
            projects,
            components,
            jobs,
            runs,
        }
    }

    /// Accept a program brief, persist the project, and queue its first
    /// advancement. Returns immediately; the pipeline runs via the worker.
    #[instrument(skip(self, brief), fields(name = %brief.name))]
    pub async fn create_project(&self, brief: ProgramBrief) -> Result<Project> {
        let project = Project::new(brief);
        project.validate().map_err(anyhow::Error::msg)?;

        self.projects
            .create(&project)
            .await
            .context("Failed to create project")?;
        self.jobs
            .enqueue(&RunJob::advance(project.id))
            .await
            .context("Failed to queue first advancement")?;

        info!(project_id = %project.id, "project created");
        Ok(project)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project> {
        self.projects
            .get(id)
            .await
            .context("Failed to load project")?
            .ok_or_else(|| anyhow!("Project {id} not found"))
    }

    pub async fn list_projects(&self, include_archived: bool) -> Result<Vec<Project>> {
        self.projects
            .list(include_archived)
            .await
            .context("Failed to list projects")
    }

    pub async fn components(&self, project_id: Uuid) -> Result<Vec<ResearchComponent>> {
        self.components
            .list_for_project(project_id)
            .await
            .context("Failed to load components")
    }

    /// Operator retry: reset an errored stage to pending and queue an
    /// advancement to pick it up.
    pub async fn retry_stage(&self, project_id: Uuid, stage: StageType) -> Result<()> {
        let project = self.get_project(project_id).await?;
        if project.is_terminal() {
            bail!(
                "Project is {}; terminal projects cannot be resumed",
                project.status.as_str()
            );
        }

        let mut component = self
            .components
            .get(project_id, stage)
            .await
            .context("Failed to load component")?
            .ok_or_else(|| anyhow!("No {stage} component on project {project_id}"))?;
        component.reset_for_retry().map_err(anyhow::Error::msg)?;
        self.components
            .update(&component)
            .await
            .context("Failed to reset component")?;

        if self
            .jobs
            .active_for_project(project_id)
            .await
            .context("Failed to check for active job")?
            .is_none()
        {
            self.jobs
                .enqueue(&RunJob::advance(project_id))
                .await
                .context("Failed to queue advancement")?;
        }

        info!(%project_id, %stage, "stage reset for retry");
        Ok(())
    }

    /// Archive a project so default listings skip it. Archival is a view
    /// concern; it does not touch pipeline state.
    pub async fn archive_project(&self, id: Uuid) -> Result<Project> {
        let mut project = self.get_project(id).await?;
        if !project.archived {
            project.archived = true;
            project.updated_at = Utc::now();
            self.projects
                .update(&project)
                .await
                .context("Failed to archive project")?;
        }
        Ok(project)
    }

    /// Fetch a stored report: the latest run, or a specific version.
    pub async fn report(&self, project_id: Uuid, version: Option<u32>) -> Result<PipelineRun> {
        match version {
            None => self
                .runs
                .get_latest(project_id)
                .await
                .context("Failed to load latest run")?
                .ok_or_else(|| anyhow!("No report yet for project {project_id}")),
            Some(v) => self
                .runs
                .list_for_project(project_id)
                .await
                .context("Failed to list runs")?
                .into_iter()
                .find(|run| run.version == v)
                .ok_or_else(|| anyhow!("No version {v} report for project {project_id}")),
        }
    }
}
