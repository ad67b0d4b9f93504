//! Project CLI commands.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{Project, ResearchComponent, StageType};

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Submit a program brief for validation
    Create {
        /// Program name
        name: String,
        /// Program type, e.g. "non-credit certificate"
        #[arg(short = 't', long)]
        program_type: Option<String>,
        /// Intended audience
        #[arg(short, long)]
        audience: Option<String>,
        /// Free-form constraints (budget, timeline, facilities)
        #[arg(short, long)]
        constraints: Option<String>,
    },
    /// List projects
    List {
        /// Include archived projects
        #[arg(long)]
        archived: bool,
    },
    /// Show a project with its per-stage progress
    Show {
        /// Project ID
        id: String,
    },
    /// Reset an errored stage and queue a new advancement
    RetryStage {
        /// Project ID
        id: String,
        /// Stage name, e.g. labor_market
        stage: String,
    },
    /// Archive a project so it no longer shows in listings
    Archive {
        /// Project ID
        id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectOutput {
    pub id: String,
    pub name: String,
    pub program_type: Option<String>,
    pub status: String,
    pub archived: bool,
    pub created_at: String,
}

impl From<&Project> for ProjectOutput {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.brief.name.clone(),
            program_type: project.brief.program_type.clone(),
            status: project.status.as_str().to_string(),
            archived: project.archived,
            created_at: project.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectListOutput {
    pub projects: Vec<ProjectOutput>,
    pub total: usize,
}

impl CommandOutput for ProjectListOutput {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }

        let mut table = list_table(&["id", "name", "type", "status"]);
        for project in &self.projects {
            table.add_row(vec![
                project.id[..8].to_string(),
                truncate(&project.name, 40),
                project.program_type.clone().unwrap_or_default(),
                project.status.clone(),
            ]);
        }
        format!("Found {} project(s):\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StageProgressOutput {
    pub stage: String,
    pub title: String,
    pub status: String,
    pub score: Option<f64>,
    pub attempts: u32,
    pub error: Option<String>,
}

impl From<&ResearchComponent> for StageProgressOutput {
    fn from(component: &ResearchComponent) -> Self {
        Self {
            stage: component.stage.as_str().to_string(),
            title: component.stage.title().to_string(),
            status: component.status.as_str().to_string(),
            score: component.score,
            attempts: component.attempts,
            error: component.error.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectDetailOutput {
    pub project: ProjectOutput,
    pub audience: Option<String>,
    pub constraints: Option<String>,
    pub stages: Vec<StageProgressOutput>,
}

impl CommandOutput for ProjectDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Project: {}", self.project.name),
            format!("ID: {}", self.project.id),
            format!("Status: {}", self.project.status),
        ];
        if let Some(program_type) = &self.project.program_type {
            lines.push(format!("Type: {program_type}"));
        }
        if let Some(audience) = &self.audience {
            lines.push(format!("Audience: {audience}"));
        }
        if let Some(constraints) = &self.constraints {
            lines.push(format!("Constraints: {constraints}"));
        }

        if !self.stages.is_empty() {
            let mut table = list_table(&["stage", "status", "score", "attempts", "error"]);
            for stage in &self.stages {
                table.add_row(vec![
                    stage.title.clone(),
                    stage.status.clone(),
                    stage
                        .score
                        .map(|s| format!("{s:.1}"))
                        .unwrap_or_default(),
                    stage.attempts.to_string(),
                    stage.error.as_deref().map(|e| truncate(e, 40)).unwrap_or_default(),
                ]);
            }
            lines.push(format!("\n{table}"));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectActionOutput {
    pub success: bool,
    pub message: String,
    pub project: Option<ProjectOutput>,
}

impl CommandOutput for ProjectActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_project_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid project ID: {id}"))
}

pub async fn execute(args: ProjectArgs, json_mode: bool) -> Result<()> {
    let ctx = AppContext::init().await?;
    let service = ctx.project_service();

    match args.command {
        ProjectCommands::Create {
            name,
            program_type,
            audience,
            constraints,
        } => {
            let project = service
                .create_project(crate::domain::models::ProgramBrief {
                    name,
                    program_type,
                    audience,
                    constraints,
                })
                .await?;
            output(
                &ProjectActionOutput {
                    success: true,
                    message: format!(
                        "Project {} created; validation queued. Run 'wavelength worker' to process it.",
                        project.id
                    ),
                    project: Some(ProjectOutput::from(&project)),
                },
                json_mode,
            );
        }
        ProjectCommands::List { archived } => {
            let projects = service.list_projects(archived).await?;
            output(
                &ProjectListOutput {
                    total: projects.len(),
                    projects: projects.iter().map(ProjectOutput::from).collect(),
                },
                json_mode,
            );
        }
        ProjectCommands::Show { id } => {
            let project_id = parse_project_id(&id)?;
            let project = service.get_project(project_id).await?;
            let components = service.components(project_id).await?;
            output(
                &ProjectDetailOutput {
                    project: ProjectOutput::from(&project),
                    audience: project.brief.audience.clone(),
                    constraints: project.brief.constraints.clone(),
                    stages: components.iter().map(StageProgressOutput::from).collect(),
                },
                json_mode,
            );
        }
        ProjectCommands::RetryStage { id, stage } => {
            let project_id = parse_project_id(&id)?;
            let stage = StageType::from_str(&stage)
                .ok_or_else(|| anyhow!("Unknown stage: {stage}"))?;
            service.retry_stage(project_id, stage).await?;
            output(
                &ProjectActionOutput {
                    success: true,
                    message: format!("Stage {stage} reset; advancement queued."),
                    project: None,
                },
                json_mode,
            );
        }
        ProjectCommands::Archive { id } => {
            let project_id = parse_project_id(&id)?;
            let project = service.archive_project(project_id).await?;
            output(
                &ProjectActionOutput {
                    success: true,
                    message: format!("Project {} archived.", project.id),
                    project: Some(ProjectOutput::from(&project)),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
