//! Domain models for the validation pipeline.

pub mod component;
pub mod config;
pub mod event;
pub mod job;
pub mod project;
pub mod run;
pub mod score;
pub mod stage;

pub use component::{ComponentStatus, ResearchComponent, StageOutput};
pub use event::{EventLevel, RunEvent};
pub use config::{Config, DatabaseConfig, LoggingConfig, PipelineConfig};
pub use job::{JobKind, JobStatus, RunJob};
pub use project::{ProgramBrief, Project, ProjectStatus};
pub use run::PipelineRun;
pub use score::{DimensionScore, OverrideTrigger, Recommendation, ScoreCard};
pub use stage::StageType;
