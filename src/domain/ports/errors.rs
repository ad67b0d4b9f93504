use thiserror::Error;
use uuid::Uuid;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid column value: {0}")]
    InvalidValue(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DatabaseError {
    /// Whether this error is a uniqueness violation. Run-identifier
    /// allocation relies on this to detect count-then-insert races.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            Self::QueryFailed(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Errors crossing the stage-capability boundary.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("stage timed out after {0}s")]
    Timeout(u64),

    #[error("analysis failed: {0}")]
    Analysis(String),
}
