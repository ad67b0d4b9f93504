//! Implementation of the `wavelength run` command: process one queued job.

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::services::{AdvanceOutcome, WorkerOutcome};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Process this project's job instead of the oldest due job
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    pub outcome: String,
    pub detail: String,
    pub job_id: Option<String>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        format!("{}: {}", self.outcome, self.detail)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn describe(outcome: &WorkerOutcome) -> RunOutput {
    match outcome {
        WorkerOutcome::Idle => RunOutput {
            outcome: "idle".to_string(),
            detail: "No queued job is due.".to_string(),
            job_id: None,
        },
        WorkerOutcome::ClaimLost { job_id } => RunOutput {
            outcome: "claim_lost".to_string(),
            detail: "Another worker claimed the job first.".to_string(),
            job_id: Some(job_id.to_string()),
        },
        WorkerOutcome::Processed {
            job_id,
            project_id,
            advance,
        } => RunOutput {
            outcome: "processed".to_string(),
            detail: match advance {
                AdvanceOutcome::AlreadyTerminal => {
                    format!("Project {project_id} is already terminal.")
                }
                AdvanceOutcome::ResearchStarted => {
                    format!("Research started for project {project_id}.")
                }
                AdvanceOutcome::ResearchInProgress { remaining } => {
                    format!("{remaining} research stage(s) still outstanding.")
                }
                AdvanceOutcome::GateFailed { completed } => format!(
                    "Project {project_id} failed: only {completed} research stage(s) completed."
                ),
                AdvanceOutcome::GatePassed { completed } => {
                    format!("Research gate passed with {completed} completed stage(s).")
                }
                AdvanceOutcome::SynthesisInProgress { stage } => {
                    format!("Dispatched {stage} for project {project_id}.")
                }
                AdvanceOutcome::Finalized {
                    run_id,
                    recommendation,
                } => format!("Run {run_id} finalized: {recommendation}."),
            },
            job_id: Some(job_id.to_string()),
        },
        WorkerOutcome::Retried {
            job_id,
            attempt,
            error,
        } => RunOutput {
            outcome: "retried".to_string(),
            detail: format!("Slice failed on attempt {attempt}, requeued: {error}"),
            job_id: Some(job_id.to_string()),
        },
        WorkerOutcome::Exhausted { job_id, error } => RunOutput {
            outcome: "failed".to_string(),
            detail: format!("Job gave up: {error}"),
            job_id: Some(job_id.to_string()),
        },
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let ctx = AppContext::init().await?;
    let worker = ctx.worker();

    let outcome = match args.project {
        Some(id) => {
            let project_id =
                Uuid::parse_str(&id).with_context(|| format!("Invalid project ID: {id}"))?;
            worker.process_project(project_id).await?
        }
        None => worker.process_next().await?,
    };

    output(&describe(&outcome), json_mode);
    Ok(())
}
