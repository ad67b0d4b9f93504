//! Project domain model.
//!
//! A project is one evaluation request for a proposed workforce-training
//! program. Its status is mutated only by the orchestrator; projects are
//! never deleted, only archived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a validation project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Submitted, pipeline not yet started
    Intake,
    /// Independent research stages in flight
    Researching,
    /// Research gate passed; synthesis and QA in flight
    Synthesizing,
    /// Pipeline finished, report available
    Complete,
    /// Too few research stages completed to score the program
    Failed,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Intake
    }
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Researching => "researching",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "intake" => Some(Self::Intake),
            "researching" => Some(Self::Researching),
            "synthesizing" => Some(Self::Synthesizing),
            "complete" | "completed" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<ProjectStatus> {
        match self {
            Self::Intake => vec![Self::Researching],
            Self::Researching => vec![Self::Synthesizing, Self::Failed],
            Self::Synthesizing => vec![Self::Complete, Self::Failed],
            Self::Complete | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Program metadata supplied at intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramBrief {
    /// Program name, e.g. "Industrial Maintenance Technician Certificate"
    pub name: String,
    /// Program type, e.g. "non-credit certificate"
    pub program_type: Option<String>,
    /// Intended audience, e.g. "adult career changers"
    pub audience: Option<String>,
    /// Free-form constraints (budget, timeline, facility limits)
    pub constraints: Option<String>,
}

/// One evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub brief: ProgramBrief,
    pub status: ProjectStatus,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(brief: ProgramBrief) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            brief,
            status: ProjectStatus::default(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new status, enforcing the state machine.
    pub fn transition_to(&mut self, next: ProjectStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Cannot transition project from {} to {}",
                self.status.as_str(),
                next.as_str()
            ));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.brief.name.trim().is_empty() {
            return Err("Program name cannot be empty".to_string());
        }
        Ok(())
    }
}
