//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Uniform metadata derived from every domain event.
///
/// The shape is identical for all concrete event types and stable across
/// repeated calls, so audit logs and dead-letter context can rely on it
/// without knowing the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    /// Stable routing key identifying the event variant.
    pub kind: &'static str,
    /// Globally unique event identifier, fixed at construction.
    pub event_id: Uuid,
    /// Domain object or stream the event originated from.
    pub aggregate_id: Uuid,
    /// Schema version of this event kind.
    pub event_version: i64,
    /// Timestamp of event creation, fixed at construction.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain events implement.
///
/// Events are immutable once constructed: implementations expose identity
/// through these accessors and provide no mutators.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the stable routing key (used for handler lookup).
    fn kind(&self) -> &'static str;

    /// Serializes the variant-specific payload to JSON.
    fn payload(&self) -> serde_json::Value;

    /// Returns the globally unique event identifier.
    fn event_id(&self) -> Uuid;

    /// Returns the identifier of the domain object the event belongs to.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the schema version of this event kind.
    fn event_version(&self) -> i64 {
        1
    }

    /// Returns the creation timestamp.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Returns the uniform metadata record for this event.
    fn metadata(&self) -> EventMetadata {
        EventMetadata {
            kind: self.kind(),
            event_id: self.event_id(),
            aggregate_id: self.aggregate_id(),
            event_version: self.event_version(),
            occurred_at: self.occurred_at(),
        }
    }
}
