//! Job queue semantics: claiming, backoff, and retry exhaustion.

mod common;

use chrono::Utc;

use wavelength::adapters::FixtureAnalyst;
use wavelength::domain::models::{JobStatus, PipelineConfig, StageType};
use wavelength::services::WorkerOutcome;

use common::{brief, corrupt_project_status, drain, harness, harness_with_config};

#[tokio::test]
async fn test_claim_is_exclusive() {
    let harness = harness(FixtureAnalyst::new()).await;
    let project = harness
        .service
        .create_project(brief("Paralegal Certificate"))
        .await
        .unwrap();

    let job = harness
        .jobs
        .active_for_project(project.id)
        .await
        .unwrap()
        .unwrap();

    let (a, b) = tokio::join!(harness.jobs.claim(job.id), harness.jobs.claim(job.id));
    let wins = [a.unwrap(), b.unwrap()];
    assert_eq!(wins.iter().filter(|won| **won).count(), 1);

    // A claimed job is no longer due for other pollers
    assert!(harness.jobs.next_due(Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_enqueue_is_idempotent_while_a_job_is_active() {
    let harness = harness(FixtureAnalyst::new()).await;
    let project = harness
        .service
        .create_project(brief("Paralegal Certificate"))
        .await
        .unwrap();

    let first = harness.worker.enqueue_advance(project.id).await.unwrap();
    let second = harness.worker.enqueue_advance(project.id).await.unwrap();
    assert_eq!(first.id, second.id);

    let jobs = harness.jobs.active_for_project(project.id).await.unwrap();
    assert!(jobs.is_some());
}

#[tokio::test]
async fn test_failed_slice_backs_off_before_retrying() {
    let config = PipelineConfig {
        job_backoff_base_ms: 60_000,
        ..PipelineConfig::default()
    };
    let harness = harness_with_config(FixtureAnalyst::new(), config).await;

    // A project whose stored row no longer parses fails every slice
    let project = harness
        .service
        .create_project(brief("Paralegal Certificate"))
        .await
        .unwrap();
    let job = harness
        .jobs
        .active_for_project(project.id)
        .await
        .unwrap()
        .unwrap();
    corrupt_project_status(&harness, &project).await;

    let outcome = harness.worker.process_next().await.unwrap();
    assert!(matches!(outcome, WorkerOutcome::Retried { attempt: 1, .. }));

    // Requeued a minute out, so the queue reads as idle right now
    assert!(matches!(
        harness.worker.process_next().await.unwrap(),
        WorkerOutcome::Idle
    ));

    let stored = harness.jobs.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Queued);
    assert!(stored.run_after.unwrap() > Utc::now());
    assert!(stored.last_error.unwrap().contains("shelved"));
}

#[tokio::test]
async fn test_retries_exhaust_into_a_failed_job() {
    let config = PipelineConfig {
        max_job_attempts: 2,
        job_backoff_base_ms: 0,
        ..PipelineConfig::default()
    };
    let harness = harness_with_config(FixtureAnalyst::new(), config).await;

    let project = harness
        .service
        .create_project(brief("Paralegal Certificate"))
        .await
        .unwrap();
    let job = harness
        .jobs
        .active_for_project(project.id)
        .await
        .unwrap()
        .unwrap();
    corrupt_project_status(&harness, &project).await;

    assert!(matches!(
        harness.worker.process_next().await.unwrap(),
        WorkerOutcome::Retried { .. }
    ));
    assert!(matches!(
        harness.worker.process_next().await.unwrap(),
        WorkerOutcome::Exhausted { .. }
    ));

    let stored = harness.jobs.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempts, 2);

    // A terminal job never comes back
    assert!(matches!(
        harness.worker.process_next().await.unwrap(),
        WorkerOutcome::Idle
    ));
}

#[tokio::test]
async fn test_jobs_chain_one_slice_at_a_time() {
    let mut analyst = FixtureAnalyst::new();
    for stage in StageType::INDEPENDENT {
        analyst = analyst.with_score(stage, 8.0);
    }
    let harness = harness(analyst).await;
    let project = harness
        .service
        .create_project(brief("Surgical Technology Certificate"))
        .await
        .unwrap();

    // Each processed job leaves at most one follow-up behind
    let mut slices = 0;
    loop {
        match harness.worker.process_next().await.unwrap() {
            WorkerOutcome::Idle => break,
            WorkerOutcome::Processed { .. } => {
                slices += 1;
                let active = harness.jobs.active_for_project(project.id).await.unwrap();
                assert!(active.map_or(true, |j| j.status == JobStatus::Queued));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(slices < 20, "pipeline did not settle");
    }

    // Intake, research, gate, synthesis, QA, finalize
    assert!(slices >= 5, "expected several slices, got {slices}");
    let run = harness.runs.get_latest(project.id).await.unwrap();
    assert!(run.is_some());
}

#[tokio::test]
async fn test_drained_queue_stays_drained_after_completion() {
    let mut analyst = FixtureAnalyst::new();
    for stage in StageType::INDEPENDENT {
        analyst = analyst.with_score(stage, 8.0);
    }
    let harness = harness(analyst).await;
    harness
        .service
        .create_project(brief("Welding Certificate"))
        .await
        .unwrap();

    drain(&harness.worker).await;
    assert!(matches!(
        harness.worker.process_next().await.unwrap(),
        WorkerOutcome::Idle
    ));
}
