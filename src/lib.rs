//! Wavelength - workforce program validation pipeline
//!
//! Wavelength evaluates proposed workforce-training programs through a
//! fixed two-layer research pipeline: seven independent research
//! dimensions, a synthesis stage, and a QA review, finishing with a
//! weighted go/no-go recommendation and a versioned markdown report.
//! Execution is driven by a persisted job queue that advances each
//! project one bounded slice at a time, so progress survives worker
//! crashes and short-lived invocations.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, ports, and the stage registry
//! - **Service Layer** (`services`): Orchestration, scoring, queue processing
//! - **Adapters** (`adapters`): SQLite persistence and the analyst fixture
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading
//! - **CLI Layer** (`cli`): Command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ComponentStatus, Config, DatabaseConfig, JobStatus, LoggingConfig, PipelineConfig,
    PipelineRun, ProgramBrief, Project, ProjectStatus, Recommendation, ResearchComponent,
    RunJob, ScoreCard, StageOutput, StageType,
};
pub use services::{
    AdvanceOutcome, JobWorker, PipelineOrchestrator, ProjectService, WorkerOutcome,
};
