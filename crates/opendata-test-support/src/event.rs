//! Test event — minimal `DomainEvent` implementation for tests.

use chrono::{DateTime, Utc};
use opendata_core::clock::Clock;
use opendata_core::event::DomainEvent;
use uuid::Uuid;

/// A minimal event for exercising the dispatcher without a real domain.
///
/// Cloning preserves the event identifier, which makes duplicate-delivery
/// scenarios easy to stage.
#[derive(Debug, Clone)]
pub struct StubEvent {
    kind: &'static str,
    event_id: Uuid,
    aggregate_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl StubEvent {
    /// Creates an event of the given kind with a fresh identifier.
    #[must_use]
    pub fn new(kind: &'static str, clock: &dyn Clock) -> Self {
        Self::for_aggregate(kind, Uuid::new_v4(), clock)
    }

    /// Creates an event of the given kind attached to an existing aggregate.
    #[must_use]
    pub fn for_aggregate(kind: &'static str, aggregate_id: Uuid, clock: &dyn Clock) -> Self {
        Self {
            kind,
            event_id: Uuid::new_v4(),
            aggregate_id,
            occurred_at: clock.now(),
        }
    }
}

impl DomainEvent for StubEvent {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "kind": self.kind })
    }

    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
