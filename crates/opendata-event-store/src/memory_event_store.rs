//! In-memory implementation of the `EventStore` trait.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use opendata_core::error::StoreError;
use opendata_core::event::DomainEvent;
use opendata_core::store::{DeadLetterRecord, EventStore};

/// Append-only in-memory event store.
///
/// Backs the dispatcher in a single-process deployment. Reads return
/// clones, so stored events stay untouched by consumers.
#[derive(Debug)]
pub struct MemoryEventStore<E> {
    events: RwLock<Vec<E>>,
    dead_letters: RwLock<Vec<DeadLetterRecord<E>>>,
}

impl<E> MemoryEventStore<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            dead_letters: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of stored events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn event_count(&self) -> usize {
        self.events.read().expect("event log lock poisoned").len()
    }

    /// Returns the number of stored dead-letter records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn dead_letter_count(&self) -> usize {
        self.dead_letters
            .read()
            .expect("dead letter log lock poisoned")
            .len()
    }
}

impl<E: Clone> MemoryEventStore<E> {
    /// Returns a snapshot of all dead-letter records, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn dead_letters(&self) -> Vec<DeadLetterRecord<E>> {
        self.dead_letters
            .read()
            .expect("dead letter log lock poisoned")
            .clone()
    }
}

impl<E> Default for MemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: DomainEvent + Clone> EventStore<E> for MemoryEventStore<E> {
    async fn save(&self, event: &E) -> Result<(), StoreError> {
        self.events
            .write()
            .expect("event log lock poisoned")
            .push(event.clone());
        Ok(())
    }

    async fn save_dead_letter(&self, record: DeadLetterRecord<E>) -> Result<(), StoreError> {
        self.dead_letters
            .write()
            .expect("dead letter log lock poisoned")
            .push(record);
        Ok(())
    }

    async fn get_by_aggregate_id(&self, aggregate_id: Uuid) -> Result<Vec<E>, StoreError> {
        let events = self.events.read().expect("event log lock poisoned");
        Ok(events
            .iter()
            .filter(|event| event.aggregate_id() == aggregate_id)
            .cloned()
            .collect())
    }

    async fn get_by_kind(&self, kind: &str, limit: Option<usize>) -> Result<Vec<E>, StoreError> {
        let events = self.events.read().expect("event log lock poisoned");
        let matching = events.iter().filter(|event| event.kind() == kind);
        Ok(match limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }
}
