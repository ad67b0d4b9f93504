//! Human-readable run identifier allocation.
//!
//! Identifiers look like `WV-S46-20260830-003`: a fixed product prefix, a
//! short model code, the UTC date, and a zero-padded per-day sequence. The
//! sequence is computed by counting existing identifiers with the day's
//! prefix; the unique index on `pipeline_runs.run_id` backstops the race
//! where two allocations count the same day concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{DatabaseError, RunRepository};

const PRODUCT_PREFIX: &str = "WV";

/// Short code for the analysis model baked into the identifier.
pub fn model_code(model: &str) -> String {
    match model {
        "sonnet-4-6" => "S46".to_string(),
        "opus-4-6" => "O46".to_string(),
        "sonnet-4-5" => "S45".to_string(),
        "haiku-3-7" => "H37".to_string(),
        other => {
            // Unknown model: first letter plus any digits, uppercased.
            let mut code: String = other
                .chars()
                .take(1)
                .chain(other.chars().filter(char::is_ascii_digit))
                .collect();
            code.make_ascii_uppercase();
            if code.is_empty() {
                "UNK".to_string()
            } else {
                code
            }
        }
    }
}

pub struct RunIdAllocator {
    runs: Arc<dyn RunRepository>,
}

impl RunIdAllocator {
    pub fn new(runs: Arc<dyn RunRepository>) -> Self {
        Self { runs }
    }

    /// Next candidate identifier for `model` on the day of `now`.
    ///
    /// Not reserved: the identifier only becomes taken when the run row is
    /// inserted. Callers must treat a unique violation on insert as "count
    /// again and retry".
    pub async fn allocate(
        &self,
        model: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let prefix = format!(
            "{PRODUCT_PREFIX}-{}-{}-",
            model_code(model),
            now.format("%Y%m%d")
        );
        let existing = self.runs.count_run_id_prefix(&prefix).await?;
        let candidate = format!("{prefix}{:03}", existing + 1);
        debug!(%candidate, existing, "allocated run id candidate");
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockRunRepository;
    use chrono::TimeZone;

    #[test]
    fn known_model_codes() {
        assert_eq!(model_code("sonnet-4-6"), "S46");
        assert_eq!(model_code("opus-4-6"), "O46");
        assert_eq!(model_code("sonnet-4-5"), "S45");
        assert_eq!(model_code("haiku-3-7"), "H37");
    }

    #[test]
    fn unknown_model_code_is_derived() {
        assert_eq!(model_code("granite-9-2"), "G92");
        assert_eq!(model_code(""), "UNK");
    }

    #[tokio::test]
    async fn sequence_counts_the_day_prefix() {
        let mut runs = MockRunRepository::new();
        runs.expect_count_run_id_prefix()
            .withf(|prefix| prefix == "WV-S46-20260115-")
            .returning(|_| Ok(2));

        let allocator = RunIdAllocator::new(Arc::new(runs));
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();
        let id = allocator.allocate("sonnet-4-6", now).await.unwrap();
        assert_eq!(id, "WV-S46-20260115-003");
    }

    #[tokio::test]
    async fn first_run_of_the_day_is_001() {
        let mut runs = MockRunRepository::new();
        runs.expect_count_run_id_prefix().returning(|_| Ok(0));

        let allocator = RunIdAllocator::new(Arc::new(runs));
        let id = allocator
            .allocate("opus-4-6", Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(id, "WV-O46-20260301-001");
    }
}
