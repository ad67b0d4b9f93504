//! Executes one stage of one project against the analyst capability.
//!
//! Failure isolation lives here: whatever the analyst does, the outcome is
//! a single terminal write on the component (completed with output, or
//! errored with a truncated diagnostic). Analyst panics and overlong calls
//! never escape as pipeline failures.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, instrument, warn};

use crate::domain::models::{
    ComponentStatus, EventLevel, Project, ResearchComponent, RunEvent, StageType,
};
use crate::domain::ports::{ComponentRepository, StageAnalyst, StageError};
use crate::services::telemetry::Telemetry;

#[derive(Clone)]
pub struct StageRunner {
    components: Arc<dyn ComponentRepository>,
    analyst: Arc<dyn StageAnalyst>,
    telemetry: Telemetry,
    stage_timeout: Duration,
}

impl StageRunner {
    pub fn new(
        components: Arc<dyn ComponentRepository>,
        analyst: Arc<dyn StageAnalyst>,
        telemetry: Telemetry,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            components,
            analyst,
            telemetry,
            stage_timeout,
        }
    }

    /// Run one stage to a terminal component state.
    ///
    /// Marks the component running (counting the attempt), invokes the
    /// analyst under the stage timeout, and writes exactly one terminal
    /// result. Returns the component as written.
    #[instrument(skip(self, project), fields(project_id = %project.id, stage = %stage))]
    pub async fn run_stage(
        &self,
        project: &Project,
        stage: StageType,
    ) -> Result<ResearchComponent> {
        let mut component = self
            .components
            .get(project.id, stage)
            .await
            .context("Failed to load component")?
            .ok_or_else(|| anyhow!("No component for stage {stage} on project {}", project.id))?;

        component.status = ComponentStatus::Running;
        component.attempts += 1;
        self.components
            .update(&component)
            .await
            .context("Failed to mark component running")?;

        self.telemetry
            .record(
                RunEvent::new(
                    project.id,
                    EventLevel::Info,
                    "stage_started",
                    format!("{} analysis started", stage.title()),
                )
                .with_stage(stage)
                .with_metadata(serde_json::json!({ "attempt": component.attempts })),
            )
            .await;

        let predecessors = self.load_predecessors(project, stage).await?;

        let outcome =
            tokio::time::timeout(self.stage_timeout, self.analyst.analyze(project, stage, &predecessors))
                .await
                .unwrap_or(Err(StageError::Timeout(self.stage_timeout.as_secs())));

        match outcome {
            Ok(output) if stage.is_scored() && output.score.is_none() => {
                self.record_failure(&mut component, "Analyst returned no score for a scored stage")
                    .await;
            }
            Ok(output) => {
                let score = output.score;
                component.complete(output);
                info!(score = ?score, "stage completed");
                self.telemetry
                    .record(
                        RunEvent::new(
                            project.id,
                            EventLevel::Info,
                            "stage_completed",
                            format!("{} analysis completed", stage.title()),
                        )
                        .with_stage(stage)
                        .with_metadata(serde_json::json!({ "score": score })),
                    )
                    .await;
            }
            Err(err) => {
                self.record_failure(&mut component, &err.to_string()).await;
            }
        }

        self.components
            .update(&component)
            .await
            .context("Failed to persist stage result")?;

        Ok(component)
    }

    async fn record_failure(&self, component: &mut ResearchComponent, diagnostic: &str) {
        component.fail(diagnostic);
        warn!(error = %diagnostic, "stage failed");
        self.telemetry
            .record(
                RunEvent::new(
                    component.project_id,
                    EventLevel::Warn,
                    "stage_failed",
                    format!("{} analysis failed: {diagnostic}", component.stage.title()),
                )
                .with_stage(component.stage)
                .with_metadata(serde_json::json!({ "attempt": component.attempts })),
            )
            .await;
    }

    /// Completed components of the stage's dependency set, registry order.
    async fn load_predecessors(
        &self,
        project: &Project,
        stage: StageType,
    ) -> Result<Vec<ResearchComponent>> {
        let deps = stage.depends_on();
        if deps.is_empty() {
            return Ok(Vec::new());
        }

        let all = self
            .components
            .list_for_project(project.id)
            .await
            .context("Failed to load predecessor components")?;

        Ok(all
            .into_iter()
            .filter(|c| deps.contains(&c.stage) && c.status == ComponentStatus::Completed)
            .collect())
    }
}
