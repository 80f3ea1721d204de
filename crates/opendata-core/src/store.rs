//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::DomainEvent;

/// A failed delivery captured for later inspection.
///
/// Created by the dispatcher when a handler rejects an event. Persisting
/// the record is itself best-effort.
#[derive(Debug, Clone)]
pub struct DeadLetterRecord<E> {
    /// The event the handler failed on.
    pub event: E,
    /// Failure message reported by the handler.
    pub error_message: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Store trait for persisting events and dead-letter records.
#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Persists a single event.
    async fn save(&self, event: &E) -> Result<(), StoreError>;

    /// Persists a dead-letter record for a failed delivery.
    async fn save_dead_letter(&self, record: DeadLetterRecord<E>) -> Result<(), StoreError>;

    /// Loads all events for a given domain object, in insertion order.
    async fn get_by_aggregate_id(&self, aggregate_id: Uuid) -> Result<Vec<E>, StoreError>;

    /// Loads events of one kind, oldest first, up to `limit` when given.
    async fn get_by_kind(&self, kind: &str, limit: Option<usize>) -> Result<Vec<E>, StoreError>;
}
