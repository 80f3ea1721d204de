//! Shared test mocks and utilities for the Open Data API backend.

mod clock;
mod event;
mod handler;
mod store;

pub use clock::{FixedClock, MutableClock};
pub use event::StubEvent;
pub use handler::{CallLog, FailingHandler, GatedHandler, RecordingHandler, call_log};
pub use store::FailingEventStore;
