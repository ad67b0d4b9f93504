//! Pipeline orchestration.
//!
//! `advance` performs exactly one bounded slice of work for one project
//! and returns. It never loops the whole pipeline to completion; the job
//! worker strings slices together, so a crash between slices loses at
//! most one slice. Which slice runs is derived entirely from persisted
//! state, making advancement idempotent: re-running a slice that already
//! happened is a no-op.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{
    ComponentStatus, EventLevel, PipelineConfig, PipelineRun, Project, ProjectStatus,
    Recommendation, ResearchComponent, RunEvent, StageType,
};
use crate::domain::ports::{ComponentRepository, ProjectRepository, RunRepository};
use crate::services::report::{self, ReportInput};
use crate::services::run_id::RunIdAllocator;
use crate::services::scoring::{self, StageScore};
use crate::services::stage_runner::StageRunner;
use crate::services::telemetry::Telemetry;

/// Bound on run-id allocation retries after unique-constraint collisions.
const MAX_RUN_ID_ATTEMPTS: u32 = 5;

/// What one advancement slice did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Project already complete or failed; nothing to do
    AlreadyTerminal,
    /// Components seeded, project moved to researching
    ResearchStarted,
    /// Research stages dispatched or still outstanding
    ResearchInProgress { remaining: usize },
    /// Too few research stages completed; project failed
    GateFailed { completed: usize },
    /// Gate passed, project moved to synthesizing
    GatePassed { completed: usize },
    /// Synthesis or QA dispatched this slice
    SynthesisInProgress { stage: StageType },
    /// Run finalized, report stored, project complete
    Finalized {
        run_id: String,
        recommendation: Recommendation,
    },
}

impl AdvanceOutcome {
    /// Whether the project still has pipeline work ahead of it.
    pub fn needs_follow_up(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyTerminal | Self::GateFailed { .. } | Self::Finalized { .. }
        )
    }
}

pub struct PipelineOrchestrator {
    projects: Arc<dyn ProjectRepository>,
    components: Arc<dyn ComponentRepository>,
    runs: Arc<dyn RunRepository>,
    stage_runner: StageRunner,
    run_ids: RunIdAllocator,
    telemetry: Telemetry,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        components: Arc<dyn ComponentRepository>,
        runs: Arc<dyn RunRepository>,
        stage_runner: StageRunner,
        run_ids: RunIdAllocator,
        telemetry: Telemetry,
        config: PipelineConfig,
    ) -> Self {
        Self {
            projects,
            components,
            runs,
            stage_runner,
            run_ids,
            telemetry,
            config,
        }
    }

    /// Advance a project's pipeline by one bounded slice.
    #[instrument(skip(self))]
    pub async fn advance(&self, project_id: uuid::Uuid) -> Result<AdvanceOutcome> {
        let project = self
            .projects
            .get(project_id)
            .await
            .context("Failed to load project")?
            .ok_or_else(|| anyhow!("Project {project_id} not found"))?;

        match project.status {
            ProjectStatus::Complete | ProjectStatus::Failed => {
                debug!("project already terminal, slice is a no-op");
                Ok(AdvanceOutcome::AlreadyTerminal)
            }
            ProjectStatus::Intake => self.start_research(project).await,
            ProjectStatus::Researching => self.research_slice(project).await,
            ProjectStatus::Synthesizing => self.synthesis_slice(project).await,
        }
    }

    /// Intake slice: seed one component per stage and open research.
    async fn start_research(&self, mut project: Project) -> Result<AdvanceOutcome> {
        for stage in StageType::ALL {
            let existing = self
                .components
                .get(project.id, stage)
                .await
                .context("Failed to check for existing component")?;
            if existing.is_none() {
                self.components
                    .create(&ResearchComponent::new(project.id, stage))
                    .await
                    .context("Failed to seed component")?;
            }
        }

        self.transition(&mut project, ProjectStatus::Researching)
            .await?;
        info!("research started");
        self.telemetry
            .record(RunEvent::new(
                project.id,
                EventLevel::Info,
                "pipeline_started",
                format!("Validation pipeline started for {}", project.brief.name),
            ))
            .await;

        Ok(AdvanceOutcome::ResearchStarted)
    }

    /// Research slice: fan out every dispatchable independent stage, then
    /// evaluate the dependency gate if research has settled.
    async fn research_slice(&self, mut project: Project) -> Result<AdvanceOutcome> {
        let components = self
            .components
            .list_for_project(project.id)
            .await
            .context("Failed to load components")?;

        let dispatchable: Vec<StageType> = components
            .iter()
            .filter(|c| {
                c.stage.is_independent() && c.needs_dispatch(self.config.max_stage_attempts)
            })
            .map(|c| c.stage)
            .collect();

        if !dispatchable.is_empty() {
            self.fan_out(&project, dispatchable).await;
        }

        let components = self
            .components
            .list_for_project(project.id)
            .await
            .context("Failed to reload components")?;

        let independents: Vec<&ResearchComponent> = components
            .iter()
            .filter(|c| c.stage.is_independent())
            .collect();
        let remaining = independents
            .iter()
            .filter(|c| c.needs_dispatch(self.config.max_stage_attempts))
            .count();
        if remaining > 0 {
            return Ok(AdvanceOutcome::ResearchInProgress { remaining });
        }

        let completed = independents
            .iter()
            .filter(|c| c.status == ComponentStatus::Completed)
            .count();

        if completed < self.config.min_scored_stages {
            warn!(
                completed,
                required = self.config.min_scored_stages,
                "research gate failed"
            );
            self.transition(&mut project, ProjectStatus::Failed).await?;
            self.telemetry
                .record(
                    RunEvent::new(
                        project.id,
                        EventLevel::Error,
                        "gate_failed",
                        format!(
                            "Only {completed} of {} research stages completed; \
                             cannot score the program",
                            StageType::INDEPENDENT.len()
                        ),
                    )
                    .with_metadata(serde_json::json!({
                        "completed": completed,
                        "required": self.config.min_scored_stages,
                    })),
                )
                .await;
            return Ok(AdvanceOutcome::GateFailed { completed });
        }

        self.transition(&mut project, ProjectStatus::Synthesizing)
            .await?;
        info!(completed, "research gate passed");
        self.telemetry
            .record(RunEvent::new(
                project.id,
                EventLevel::Info,
                "gate_passed",
                format!("{completed} research stages completed; synthesis unlocked"),
            ))
            .await;

        Ok(AdvanceOutcome::GatePassed { completed })
    }

    /// Synthesis slice: run synthesis, then QA, then finalize. One stage
    /// per slice keeps the slice inside the invocation budget.
    async fn synthesis_slice(&self, project: Project) -> Result<AdvanceOutcome> {
        let synthesis = self
            .components
            .get(project.id, StageType::TigerTeamSynthesis)
            .await
            .context("Failed to load synthesis component")?
            .ok_or_else(|| anyhow!("Synthesis component missing for project {}", project.id))?;

        if synthesis.needs_dispatch(self.config.max_stage_attempts) {
            self.stage_runner
                .run_stage(&project, StageType::TigerTeamSynthesis)
                .await?;
            return Ok(AdvanceOutcome::SynthesisInProgress {
                stage: StageType::TigerTeamSynthesis,
            });
        }

        // QA only runs against a completed synthesis; an errored synthesis
        // becomes a report gap, not a dead end.
        if synthesis.status == ComponentStatus::Completed {
            let qa = self
                .components
                .get(project.id, StageType::QaReview)
                .await
                .context("Failed to load QA component")?
                .ok_or_else(|| anyhow!("QA component missing for project {}", project.id))?;

            if qa.needs_dispatch(self.config.max_stage_attempts) {
                self.stage_runner
                    .run_stage(&project, StageType::QaReview)
                    .await?;
                return Ok(AdvanceOutcome::SynthesisInProgress {
                    stage: StageType::QaReview,
                });
            }
        }

        self.finalize(project).await
    }

    /// Score, assemble the report, allocate a run identifier, and store the
    /// run. The unique index on run_id is the arbiter of identifier races;
    /// a collision means recount and retry.
    async fn finalize(&self, mut project: Project) -> Result<AdvanceOutcome> {
        let components = self
            .components
            .list_for_project(project.id)
            .await
            .context("Failed to load components")?;

        let scores: Vec<StageScore> = StageType::INDEPENDENT
            .iter()
            .map(|stage| StageScore {
                stage: *stage,
                score: components
                    .iter()
                    .find(|c| c.stage == *stage && c.status == ComponentStatus::Completed)
                    .and_then(|c| c.score),
            })
            .collect();
        let card = scoring::aggregate(&scores);

        let version = self
            .runs
            .latest_version(project.id)
            .await
            .context("Failed to determine report version")?
            + 1;
        let now = Utc::now();
        let config_snapshot =
            serde_json::to_value(&self.config).context("Failed to snapshot configuration")?;

        for attempt in 1..=MAX_RUN_ID_ATTEMPTS {
            let run_id = self
                .run_ids
                .allocate(&self.config.model, now)
                .await
                .context("Failed to allocate run identifier")?;

            let markdown = report::assemble(&ReportInput {
                project: &project,
                components: &components,
                card: &card,
                run_id: &run_id,
                version,
                generated_at: now,
            });

            let mut run = PipelineRun::new(
                project.id,
                run_id.clone(),
                self.config.model.clone(),
                self.config.pipeline_version.clone(),
                config_snapshot.clone(),
                version,
            );
            run.stage_scores = card
                .dimensions
                .iter()
                .map(|d| (d.stage.as_str().to_string(), d.score))
                .collect();
            run.composite_score = Some(card.composite);
            run.recommendation = Some(card.recommendation.as_str().to_string());
            run.report_hash = Some(report::report_hash(&markdown));
            run.report_markdown = Some(markdown);
            run.runtime_seconds =
                Some((now - project.created_at).num_milliseconds() as f64 / 1000.0);
            run.completed_at = Some(now);

            match self.runs.insert(&run).await {
                Ok(()) => {
                    self.transition(&mut project, ProjectStatus::Complete)
                        .await?;
                    info!(%run_id, recommendation = %card.recommendation, "run finalized");
                    self.telemetry
                        .record(
                            RunEvent::new(
                                project.id,
                                EventLevel::Info,
                                "run_completed",
                                format!(
                                    "Run {run_id} finalized: {} ({:.1}/10)",
                                    card.recommendation, card.composite
                                ),
                            )
                            .with_metadata(serde_json::json!({
                                "run_id": run_id,
                                "version": version,
                                "composite": card.composite,
                            })),
                        )
                        .await;
                    return Ok(AdvanceOutcome::Finalized {
                        run_id,
                        recommendation: card.recommendation,
                    });
                }
                Err(err) if err.is_unique_violation() => {
                    debug!(%run_id, attempt, "run identifier collision, recounting");
                }
                Err(err) => {
                    return Err(err).context("Failed to store pipeline run");
                }
            }
        }

        bail!("Run identifier allocation failed after {MAX_RUN_ID_ATTEMPTS} collisions")
    }

    /// Dispatch stages concurrently under the semaphore, bounded by the
    /// invocation budget. Stage failures are already isolated inside the
    /// runner; infrastructure errors are logged and surface on the next
    /// slice as still-dispatchable components.
    async fn fan_out(&self, project: &Project, stages: Vec<StageType>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_stages));
        let budget = Duration::from_secs(self.config.invocation_budget_secs);

        let mut tasks = JoinSet::new();
        for stage in stages {
            let semaphore = semaphore.clone();
            let runner = self.stage_runner.clone();
            let project = project.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                if let Err(err) = runner.run_stage(&project, stage).await {
                    warn!(%stage, error = %err, "stage dispatch failed");
                }
            });
        }

        let drained = tokio::time::timeout(budget, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            // Abandoned stages stay Running and are re-dispatched next slice.
            warn!(
                budget_secs = self.config.invocation_budget_secs,
                "invocation budget expired mid-research"
            );
            tasks.abort_all();
        }
    }

    async fn transition(&self, project: &mut Project, next: ProjectStatus) -> Result<()> {
        project.transition_to(next).map_err(anyhow::Error::msg)?;
        self.projects
            .update(project)
            .await
            .context("Failed to persist project status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_test_pool, SqliteComponentRepository, SqliteEventRepository,
        SqliteProjectRepository, SqliteRunRepository,
    };
    use crate::adapters::FixtureAnalyst;
    use crate::domain::models::ProgramBrief;
    use crate::domain::ports::StageAnalyst;

    async fn orchestrator_with(analyst: FixtureAnalyst) -> (PipelineOrchestrator, Project) {
        orchestrator_with_config(analyst, PipelineConfig::default()).await
    }

    async fn migrated_pool() -> sqlx::SqlitePool {
        let pool = create_test_pool().await.unwrap();
        crate::adapters::sqlite::Migrator::new(pool.clone())
            .run_embedded_migrations(crate::adapters::sqlite::all_embedded_migrations())
            .await
            .unwrap();
        pool
    }

    async fn orchestrator_with_config(
        analyst: FixtureAnalyst,
        config: PipelineConfig,
    ) -> (PipelineOrchestrator, Project) {
        let pool = migrated_pool().await;
        let runs: Arc<dyn RunRepository> = Arc::new(SqliteRunRepository::new(pool.clone()));
        orchestrator_over(pool, analyst, config, runs).await
    }

    async fn orchestrator_over(
        pool: sqlx::SqlitePool,
        analyst: FixtureAnalyst,
        config: PipelineConfig,
        runs: Arc<dyn RunRepository>,
    ) -> (PipelineOrchestrator, Project) {
        let projects = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let components: Arc<dyn ComponentRepository> =
            Arc::new(SqliteComponentRepository::new(pool.clone()));
        let telemetry = Telemetry::new(Arc::new(SqliteEventRepository::new(pool.clone())));
        let analyst: Arc<dyn StageAnalyst> = Arc::new(analyst);

        let stage_runner = StageRunner::new(
            components.clone(),
            analyst,
            telemetry.clone(),
            Duration::from_secs(config.stage_timeout_secs),
        );
        let run_ids = RunIdAllocator::new(runs.clone());

        let project = Project::new(ProgramBrief {
            name: "Commercial Driving Certificate".to_string(),
            ..Default::default()
        });
        projects.create(&project).await.unwrap();

        let orchestrator = PipelineOrchestrator::new(
            projects,
            components,
            runs,
            stage_runner,
            run_ids,
            telemetry,
            config,
        );
        (orchestrator, project)
    }

    async fn drive_to_terminal(
        orchestrator: &PipelineOrchestrator,
        project_id: uuid::Uuid,
    ) -> AdvanceOutcome {
        for _ in 0..20 {
            let outcome = orchestrator.advance(project_id).await.unwrap();
            if !outcome.needs_follow_up() {
                return outcome;
            }
        }
        panic!("pipeline did not settle in 20 slices");
    }

    #[tokio::test]
    async fn happy_path_finalizes_with_strong_go() {
        let mut analyst = FixtureAnalyst::new();
        for stage in StageType::INDEPENDENT {
            analyst = analyst.with_score(stage, 9.0);
        }
        let (orchestrator, project) = orchestrator_with(analyst).await;

        let first = orchestrator.advance(project.id).await.unwrap();
        assert_eq!(first, AdvanceOutcome::ResearchStarted);

        let outcome = drive_to_terminal(&orchestrator, project.id).await;
        let AdvanceOutcome::Finalized {
            run_id,
            recommendation,
        } = outcome
        else {
            panic!("expected finalized, got {outcome:?}");
        };
        assert!(run_id.starts_with("WV-S46-"));
        assert_eq!(recommendation, Recommendation::StrongGo);

        // Re-advancing a completed project is a no-op
        assert_eq!(
            orchestrator.advance(project.id).await.unwrap(),
            AdvanceOutcome::AlreadyTerminal
        );
    }

    #[tokio::test]
    async fn errored_stage_is_retried_then_gapped() {
        let analyst =
            FixtureAnalyst::new().with_failure(StageType::EmployerDemand, "survey API down");
        let (orchestrator, project) = orchestrator_with(analyst).await;

        let outcome = drive_to_terminal(&orchestrator, project.id).await;
        assert!(matches!(outcome, AdvanceOutcome::Finalized { .. }));

        let component = orchestrator
            .components
            .get(project.id, StageType::EmployerDemand)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(component.status, ComponentStatus::Error);
        // Initial dispatch plus one retry
        assert_eq!(component.attempts, 2);

        let run = orchestrator
            .runs
            .get_latest(project.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!run.stage_scores.contains_key("employer_demand"));
        assert!(run
            .report_markdown
            .unwrap()
            .contains("Employer Demand & Partnerships data unavailable"));
    }

    #[tokio::test]
    async fn gate_fails_when_too_few_stages_complete() {
        let mut analyst = FixtureAnalyst::new();
        // Five of seven fail: 2 completed < min_scored_stages (3)
        for stage in &StageType::INDEPENDENT[..5] {
            analyst = analyst.with_failure(*stage, "no data");
        }
        let (orchestrator, project) = orchestrator_with(analyst).await;

        let outcome = drive_to_terminal(&orchestrator, project.id).await;
        assert_eq!(outcome, AdvanceOutcome::GateFailed { completed: 2 });

        let project = orchestrator
            .projects
            .get(project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Failed);
    }

    #[tokio::test]
    async fn financial_floor_downgrades_run_to_defer() {
        let mut analyst = FixtureAnalyst::new();
        for stage in StageType::INDEPENDENT {
            analyst = analyst.with_score(stage, 8.0);
        }
        let analyst = analyst.with_score(StageType::FinancialViability, 2.0);
        let (orchestrator, project) = orchestrator_with(analyst).await;

        let outcome = drive_to_terminal(&orchestrator, project.id).await;
        let AdvanceOutcome::Finalized { recommendation, .. } = outcome else {
            panic!("expected finalized, got {outcome:?}");
        };
        assert_eq!(recommendation, Recommendation::Defer);

        let run = orchestrator
            .runs
            .get_latest(project.id)
            .await
            .unwrap()
            .unwrap();
        assert!((run.composite_score.unwrap() - 6.8).abs() < 1e-9);
        assert_eq!(run.recommendation.as_deref(), Some("Defer"));
    }

    #[tokio::test]
    async fn reruns_get_fresh_versions_and_identifiers() {
        let mut analyst = FixtureAnalyst::new();
        for stage in StageType::INDEPENDENT {
            analyst = analyst.with_score(stage, 7.0);
        }
        let (orchestrator, project) = orchestrator_with(analyst).await;
        drive_to_terminal(&orchestrator, project.id).await;

        // Second project on the same store gets the next day-sequence
        let second = Project::new(ProgramBrief {
            name: "Phlebotomy Certificate".to_string(),
            ..Default::default()
        });
        orchestrator.projects.create(&second).await.unwrap();
        let outcome = drive_to_terminal(&orchestrator, second.id).await;
        let AdvanceOutcome::Finalized { run_id, .. } = outcome else {
            panic!("expected finalized, got {outcome:?}");
        };
        assert!(run_id.ends_with("-002"));
    }

    #[tokio::test]
    async fn identifier_collision_recounts_to_the_next_sequence() {
        use crate::domain::ports::{DatabaseError, MockRunRepository};
        use std::sync::atomic::{AtomicU32, Ordering};

        // Another writer lands the day's first identifier between this
        // project's count and its insert; the recount sees the new row and
        // the retry takes the next sequence number.
        let mut runs = MockRunRepository::new();
        runs.expect_latest_version().returning(|_| Ok(0));
        let counts = Arc::new(AtomicU32::new(0));
        runs.expect_count_run_id_prefix()
            .times(2)
            .returning(move |_| Ok(counts.fetch_add(1, Ordering::SeqCst)));
        let inserts = Arc::new(AtomicU32::new(0));
        runs.expect_insert().times(2).returning(move |run| {
            if inserts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DatabaseError::ConstraintViolation(format!(
                    "pipeline_runs.run_id: {}",
                    run.run_id
                )))
            } else {
                Ok(())
            }
        });
        let runs: Arc<dyn RunRepository> = Arc::new(runs);

        let mut analyst = FixtureAnalyst::new();
        for stage in StageType::INDEPENDENT {
            analyst = analyst.with_score(stage, 8.0);
        }
        let (orchestrator, project) =
            orchestrator_over(migrated_pool().await, analyst, PipelineConfig::default(), runs)
                .await;

        let outcome = drive_to_terminal(&orchestrator, project.id).await;
        let AdvanceOutcome::Finalized { run_id, .. } = outcome else {
            panic!("expected finalized, got {outcome:?}");
        };
        assert!(run_id.ends_with("-002"), "expected the recounted sequence, got {run_id}");

        let project = orchestrator
            .projects
            .get(project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Complete);
    }
}
