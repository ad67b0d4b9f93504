//! Stage capability boundary.
//!
//! This is the one place business-specific research logic plugs into the
//! pipeline. The core treats it as an opaque async capability: given a
//! project and a stage, produce structured content, a markdown narrative,
//! and (for scored stages) a 0-10 score, or fail with a diagnostic. The
//! stage runner wraps every call in a timeout strictly inside the worker's
//! invocation budget.

use async_trait::async_trait;

use crate::domain::models::{Project, ResearchComponent, StageOutput, StageType};
use crate::domain::ports::StageError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageAnalyst: Send + Sync {
    /// Run one stage's analysis.
    ///
    /// `predecessors` holds the completed components of the stage's
    /// dependency set (empty for independent stages); synthesis consumes
    /// the seven research components, QA consumes the synthesis.
    async fn analyze(
        &self,
        project: &Project,
        stage: StageType,
        predecessors: &[ResearchComponent],
    ) -> Result<StageOutput, StageError>;
}
