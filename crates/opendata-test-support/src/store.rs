//! Test store — failing `EventStore` implementation for tests.

use async_trait::async_trait;
use opendata_core::error::StoreError;
use opendata_core::event::DomainEvent;
use opendata_core::store::{DeadLetterRecord, EventStore};
use uuid::Uuid;

/// An event store whose operations always fail. Useful for asserting that
/// persistence problems never abort a dispatch cycle.
#[derive(Debug, Default)]
pub struct FailingEventStore;

impl FailingEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

// The owned `DeadLetterRecord<E>` moves into the boxed future, so the
// event type itself must outlive it.
#[async_trait]
impl<E: DomainEvent + 'static> EventStore<E> for FailingEventStore {
    async fn save(&self, _event: &E) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn save_dead_letter(&self, _record: DeadLetterRecord<E>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get_by_aggregate_id(&self, _aggregate_id: Uuid) -> Result<Vec<E>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get_by_kind(&self, _kind: &str, _limit: Option<usize>) -> Result<Vec<E>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
