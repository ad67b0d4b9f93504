//! Best-effort run telemetry.
//!
//! Wraps the event store so call sites never have to handle its failures:
//! a telemetry write that fails is logged and dropped, it must not fail
//! the pipeline work it describes.

use std::sync::Arc;

use tracing::warn;

use crate::domain::models::RunEvent;
use crate::domain::ports::EventRepository;

#[derive(Clone)]
pub struct Telemetry {
    events: Arc<dyn EventRepository>,
}

impl Telemetry {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Record an event, swallowing store errors.
    pub async fn record(&self, event: RunEvent) {
        if let Err(err) = self.events.record(&event).await {
            warn!(
                event_type = %event.event_type,
                project_id = %event.project_id,
                error = %err,
                "failed to record run event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventLevel;
    use crate::domain::ports::{DatabaseError, MockEventRepository};
    use uuid::Uuid;

    #[tokio::test]
    async fn store_failures_are_swallowed() {
        let mut events = MockEventRepository::new();
        events
            .expect_record()
            .returning(|_| Err(DatabaseError::InvalidValue("event store down".into())));

        let telemetry = Telemetry::new(Arc::new(events));
        // Must not panic or propagate
        telemetry
            .record(RunEvent::new(
                Uuid::new_v4(),
                EventLevel::Info,
                "stage_started",
                "labor market analysis started",
            ))
            .await;
    }
}
