//! Research component domain model.
//!
//! One component is the persisted execution record of one stage for one
//! project. At most one component exists per (project, stage) pair; the
//! orchestrator and stage runner are its only writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::StageType;

/// Status of a research component.
///
/// Monotonic except for operator-initiated retry, which resets
/// `Error -> Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Created, not yet dispatched
    Pending,
    /// Analysis in flight (or abandoned by an expired invocation)
    Running,
    /// Analysis produced content, markdown, and a score
    Completed,
    /// Analysis failed; diagnostic recorded
    Error,
}

impl Default for ComponentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Completed and Error are both terminal: an errored stage does not
    /// block the pipeline, it becomes a documented gap.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// What an analyst returns for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Stage-specific structured content
    pub content: serde_json::Value,
    /// Narrative section for the final report
    pub markdown: String,
    /// Dimension score 0-10; None for unscored stages (synthesis, QA)
    pub score: Option<f64>,
}

/// Persisted execution record for one stage of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchComponent {
    pub id: Uuid,
    pub project_id: Uuid,
    pub stage: StageType,
    pub status: ComponentStatus,
    pub content: Option<serde_json::Value>,
    pub markdown: Option<String>,
    pub score: Option<f64>,
    pub error: Option<String>,
    /// How many times this stage has been dispatched
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResearchComponent {
    pub fn new(project_id: Uuid, stage: StageType) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            stage,
            status: ComponentStatus::default(),
            content: None,
            markdown: None,
            score: None,
            error: None,
            attempts: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the orchestrator should (re)dispatch this stage. A component
    /// abandoned mid-flight by an expired invocation is still `Running` and
    /// gets picked up again: its prior state was non-terminal, so the last
    /// writer wins.
    pub fn needs_dispatch(&self, max_attempts: u32) -> bool {
        match self.status {
            ComponentStatus::Pending | ComponentStatus::Running => true,
            ComponentStatus::Error => self.attempts < max_attempts,
            ComponentStatus::Completed => false,
        }
    }

    /// Record a successful analysis. Overwrites any prior result.
    pub fn complete(&mut self, output: StageOutput) {
        self.status = ComponentStatus::Completed;
        self.content = Some(output.content);
        self.markdown = Some(output.markdown);
        self.score = output.score;
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failed analysis with a truncated diagnostic.
    pub fn fail(&mut self, diagnostic: &str) {
        self.status = ComponentStatus::Error;
        self.error = Some(truncate_diagnostic(diagnostic));
        self.completed_at = Some(Utc::now());
    }

    /// Operator-initiated retry: the one sanctioned non-monotonic move.
    pub fn reset_for_retry(&mut self) -> Result<(), String> {
        if self.status != ComponentStatus::Error {
            return Err(format!(
                "Only errored components can be retried (status: {})",
                self.status.as_str()
            ));
        }
        self.status = ComponentStatus::Pending;
        self.error = None;
        self.completed_at = None;
        Ok(())
    }
}

const MAX_DIAGNOSTIC_LEN: usize = 500;

fn truncate_diagnostic(message: &str) -> String {
    if message.len() <= MAX_DIAGNOSTIC_LEN {
        return message.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}
