//! Implementation of the `wavelength report` command.

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Project ID
    pub id: String,

    /// Report version (defaults to the latest)
    #[arg(short, long)]
    pub version: Option<u32>,

    /// Print only the run summary, not the report body
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ReportOutput {
    pub run_id: String,
    pub version: u32,
    pub model: String,
    pub composite_score: Option<f64>,
    pub recommendation: Option<String>,
    pub report_hash: Option<String>,
    pub markdown: Option<String>,
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        if let Some(markdown) = &self.markdown {
            return markdown.clone();
        }
        let mut lines = vec![
            format!("Run: {}", self.run_id),
            format!("Version: {}", self.version),
            format!("Model: {}", self.model),
        ];
        if let Some(score) = self.composite_score {
            lines.push(format!("Composite: {score:.1}/10"));
        }
        if let Some(recommendation) = &self.recommendation {
            lines.push(format!("Recommendation: {recommendation}"));
        }
        if let Some(hash) = &self.report_hash {
            lines.push(format!("Report hash: {hash}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ReportArgs, json_mode: bool) -> Result<()> {
    let ctx = AppContext::init().await?;
    let service = ctx.project_service();

    let project_id =
        Uuid::parse_str(&args.id).with_context(|| format!("Invalid project ID: {}", args.id))?;
    let run = service.report(project_id, args.version).await?;

    output(
        &ReportOutput {
            run_id: run.run_id.clone(),
            version: run.version,
            model: run.model.clone(),
            composite_score: run.composite_score,
            recommendation: run.recommendation.clone(),
            report_hash: run.report_hash.clone(),
            markdown: if args.summary {
                None
            } else {
                run.report_markdown.clone()
            },
        },
        json_mode,
    );
    Ok(())
}
