//! Run event telemetry model.
//!
//! Append-only record of pipeline lifecycle events, kept alongside the
//! tracing output so operators can reconstruct a run from the store alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::StageType;

/// Severity of a run event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// One telemetry event in a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub project_id: Uuid,
    pub pipeline_run_id: Option<Uuid>,
    pub stage: Option<StageType>,
    pub level: EventLevel,
    /// e.g. "stage_started", "stage_failed", "gate_passed"
    pub event_type: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(
        project_id: Uuid,
        level: EventLevel,
        event_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            pipeline_run_id: None,
            stage: None,
            level,
            event_type: event_type.into(),
            message: message.into(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_stage(mut self, stage: StageType) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
