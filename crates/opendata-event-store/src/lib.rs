//! In-memory event store for the Open Data API.

pub mod memory_event_store;

pub use memory_event_store::MemoryEventStore;
