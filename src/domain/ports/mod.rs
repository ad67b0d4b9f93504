//! Ports (interfaces) between the domain and infrastructure.

pub mod analyst;
pub mod component_repository;
pub mod errors;
pub mod event_repository;
pub mod job_repository;
pub mod project_repository;
pub mod run_repository;

pub use analyst::StageAnalyst;
pub use component_repository::ComponentRepository;
pub use errors::{DatabaseError, StageError};
pub use event_repository::EventRepository;
pub use job_repository::JobRepository;
pub use project_repository::ProjectRepository;
pub use run_repository::RunRepository;

#[cfg(test)]
pub use analyst::MockStageAnalyst;
#[cfg(test)]
pub use component_repository::MockComponentRepository;
#[cfg(test)]
pub use event_repository::MockEventRepository;
#[cfg(test)]
pub use job_repository::MockJobRepository;
#[cfg(test)]
pub use project_repository::MockProjectRepository;
#[cfg(test)]
pub use run_repository::MockRunRepository;
