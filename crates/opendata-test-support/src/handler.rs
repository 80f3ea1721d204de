//! Test handlers — mock `EventHandler` implementations for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opendata_core::error::HandlerError;
use opendata_core::event::{DomainEvent, EventMetadata};
use opendata_core::handler::EventHandler;
use tokio::sync::{Notify, Semaphore};

/// Shared invocation log for asserting ordering across handlers.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Creates an empty shared call log.
#[must_use]
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A handler that records the metadata of every event it sees and always
/// succeeds.
#[derive(Debug)]
pub struct RecordingHandler {
    name: &'static str,
    seen: Mutex<Vec<EventMetadata>>,
    log: Option<CallLog>,
}

impl RecordingHandler {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Creates a recording handler that also appends its name to `log` on
    /// every invocation, for ordering assertions across handlers.
    #[must_use]
    pub fn with_log(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            seen: Mutex::new(Vec::new()),
            log: Some(log),
        }
    }

    /// Returns a snapshot of the metadata of every handled event.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seen(&self) -> Vec<EventMetadata> {
        self.seen.lock().unwrap().clone()
    }

    /// Returns how many events this handler has handled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl<E: DomainEvent> EventHandler<E> for RecordingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, event: &E) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(event.metadata());
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name);
        }
        Ok(())
    }
}

/// A handler that always fails with the configured message.
#[derive(Debug)]
pub struct FailingHandler {
    name: &'static str,
    message: String,
    calls: AtomicUsize,
}

impl FailingHandler {
    #[must_use]
    pub fn new(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns how many times `handle` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: DomainEvent> EventHandler<E> for FailingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, _event: &E) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::new(self.message.clone()))
    }
}

/// A handler that blocks inside `handle` until released.
///
/// Each invocation consumes one release permit, which lets tests hold a
/// dispatch cycle open at a known point.
#[derive(Debug)]
pub struct GatedHandler {
    name: &'static str,
    entered: Notify,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl GatedHandler {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entered: Notify::new(),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Waits until a `handle` call has started and is blocked on the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Releases one blocked (or future) `handle` call.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Returns how many times `handle` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: DomainEvent> EventHandler<E> for GatedHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, _event: &E) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let permit = self.gate.acquire().await.expect("gate semaphore closed");
        permit.forget();
        Ok(())
    }
}
