//! Service layer: orchestration, scoring, and queue processing.

pub mod orchestrator;
pub mod project_service;
pub mod report;
pub mod run_id;
pub mod scoring;
pub mod stage_runner;
pub mod telemetry;
pub mod worker;

pub use orchestrator::{AdvanceOutcome, PipelineOrchestrator};
pub use project_service::ProjectService;
pub use run_id::RunIdAllocator;
pub use stage_runner::StageRunner;
pub use telemetry::Telemetry;
pub use worker::{JobWorker, WorkerOutcome};
