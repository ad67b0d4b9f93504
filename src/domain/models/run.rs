//! Pipeline run domain model.
//!
//! One row per finalized execution of a project's pipeline, carrying the
//! allocated run identifier, the configuration snapshot, the score card,
//! and the assembled report. Re-runs insert a new version rather than
//! mutating the prior one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A finalized (or in-progress) pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Human-readable run identifier, `WV-{MODEL}-{YYYYMMDD}-{SEQ}`
    pub run_id: String,
    pub model: String,
    pub pipeline_version: String,
    /// Configuration snapshot at run time
    pub config: serde_json::Value,
    /// Per-dimension scores keyed by stage name (scored stages only)
    pub stage_scores: BTreeMap<String, f64>,
    pub composite_score: Option<f64>,
    pub recommendation: Option<String>,
    pub report_markdown: Option<String>,
    /// SHA-256 of the report markdown, for change detection across re-runs
    pub report_hash: Option<String>,
    /// Per-project run counter, starts at 1
    pub version: u32,
    pub runtime_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(
        project_id: Uuid,
        run_id: String,
        model: String,
        pipeline_version: String,
        config: serde_json::Value,
        version: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            run_id,
            model,
            pipeline_version,
            config,
            stage_scores: BTreeMap::new(),
            composite_score: None,
            recommendation: None,
            report_markdown: None,
            report_hash: None,
            version,
            runtime_seconds: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
