//! Event dispatcher — in-process pub/sub with at-least-once delivery.
//!
//! Producers publish events synchronously; a dispatch cycle drains the
//! queue, persists each event, and fans it out to subscribed handlers in
//! priority order. Handler failures are isolated per handler and captured
//! as dead-letter records.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use opendata_core::clock::Clock;
use opendata_core::error::HandlerError;
use opendata_core::event::DomainEvent;
use opendata_core::handler::EventHandler;
use opendata_core::store::{DeadLetterRecord, EventStore};

/// Processed-identifier window size beyond which the window is cleared
/// wholesale after a dispatch cycle.
const PROCESSED_WINDOW_LIMIT: usize = 10_000;

struct HandlerEntry<E> {
    handler: Arc<dyn EventHandler<E>>,
    priority: i32,
}

impl<E> Clone for HandlerEntry<E> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            priority: self.priority,
        }
    }
}

/// Releases the single-flight flag when a dispatch cycle ends, on every
/// exit path.
struct DispatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// In-process event dispatcher.
///
/// One instance is shared across the service. Publishing never suspends
/// and may be called from inside a handler; events published during a
/// dispatch cycle become visible to the next cycle. At most one dispatch
/// cycle runs at a time.
pub struct EventDispatcher<E: DomainEvent> {
    registry: RwLock<HashMap<&'static str, Vec<HandlerEntry<E>>>>,
    pending: Mutex<Vec<E>>,
    processed: Mutex<HashSet<Uuid>>,
    dispatching: AtomicBool,
    store: Arc<dyn EventStore<E>>,
    clock: Arc<dyn Clock>,
}

impl<E: DomainEvent + Clone> EventDispatcher<E> {
    #[must_use]
    pub fn new(store: Arc<dyn EventStore<E>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            processed: Mutex::new(HashSet::new()),
            dispatching: AtomicBool::new(false),
            store,
            clock,
        }
    }

    /// Queues an event for the next dispatch cycle.
    ///
    /// An event whose identifier is still in the processed window is
    /// dropped; redelivery of anything older than the window remains
    /// possible.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn publish(&self, event: E) {
        let event_id = event.event_id();
        let kind = event.kind();
        {
            let processed = self.processed.lock().expect("processed window lock poisoned");
            if processed.contains(&event_id) {
                warn!(event_id = %event_id, kind, "skipping already processed event");
                return;
            }
        }
        let depth = {
            let mut pending = self.pending.lock().expect("pending queue lock poisoned");
            pending.push(event);
            pending.len()
        };
        debug!(event_id = %event_id, kind, depth, "event queued");
    }

    /// Queues a batch of events, preserving their order.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn publish_all(&self, events: Vec<E>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Registers a handler for one event kind.
    ///
    /// Handlers for a kind run in descending priority order; handlers with
    /// equal priority run in subscription order. Subscribing the same
    /// handler instance to the same kind twice is ignored.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn subscribe(&self, kind: &'static str, handler: Arc<dyn EventHandler<E>>, priority: i32) {
        let mut registry = self.registry.write().expect("handler registry lock poisoned");
        let entries = registry.entry(kind).or_default();
        if entries
            .iter()
            .any(|entry| std::ptr::addr_eq(Arc::as_ptr(&entry.handler), Arc::as_ptr(&handler)))
        {
            warn!(kind, handler = handler.name(), "handler already subscribed");
            return;
        }
        let name = handler.name();
        entries.push(HandlerEntry { handler, priority });
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        info!(kind, handler = name, count = entries.len(), "handler subscribed");
    }

    /// Removes a handler registration for one event kind.
    ///
    /// Unknown kinds and handlers that were never subscribed are ignored.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn unsubscribe(&self, kind: &str, handler: &Arc<dyn EventHandler<E>>) {
        let mut registry = self.registry.write().expect("handler registry lock poisoned");
        let Some(entries) = registry.get_mut(kind) else {
            return;
        };
        let before = entries.len();
        entries.retain(|entry| !std::ptr::addr_eq(Arc::as_ptr(&entry.handler), Arc::as_ptr(handler)));
        let remaining = entries.len();
        if remaining == before {
            return;
        }
        if remaining == 0 {
            registry.remove(kind);
        }
        info!(kind, handler = handler.name(), remaining, "handler unsubscribed");
    }

    /// Runs one dispatch cycle over a snapshot of the pending queue.
    ///
    /// Only one cycle runs at a time; a call that finds another cycle in
    /// flight logs a warning and returns immediately, whatever the queue
    /// holds. Events published while the cycle runs are left for the
    /// next one.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub async fn dispatch_pending_events(&self) {
        if self
            .dispatching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("dispatch already in progress, skipping");
            return;
        }
        // The guard releases the flag on every exit from here on.
        let _guard = DispatchGuard {
            flag: &self.dispatching,
        };

        let batch = {
            let mut pending = self.pending.lock().expect("pending queue lock poisoned");
            mem::take(&mut *pending)
        };
        if batch.is_empty() {
            return;
        }
        debug!(count = batch.len(), "dispatching pending events");

        for event in batch {
            self.dispatch_event(event).await;
        }

        let cleared = {
            let mut processed = self.processed.lock().expect("processed window lock poisoned");
            let size = processed.len();
            if size > PROCESSED_WINDOW_LIMIT {
                processed.clear();
                Some(size)
            } else {
                None
            }
        };
        if let Some(size) = cleared {
            info!(size, limit = PROCESSED_WINDOW_LIMIT, "processed event window cleared");
        }
    }

    /// Discards all queued events without dispatching them.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn clear_pending_events(&self) {
        let discarded = {
            let mut pending = self.pending.lock().expect("pending queue lock poisoned");
            mem::take(&mut *pending).len()
        };
        if discarded > 0 {
            info!(discarded, "cleared pending events");
        }
    }

    /// Number of events waiting for the next dispatch cycle.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("pending queue lock poisoned").len()
    }

    /// Number of event identifiers currently held in the processed window.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn processed_len(&self) -> usize {
        self.processed
            .lock()
            .expect("processed window lock poisoned")
            .len()
    }

    /// Number of handlers registered for a kind.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.registry
            .read()
            .expect("handler registry lock poisoned")
            .get(kind)
            .map_or(0, Vec::len)
    }

    /// Whether a dispatch cycle is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::Acquire)
    }

    async fn dispatch_event(&self, event: E) {
        let metadata = event.metadata();

        // Persistence is best-effort; handlers still run on failure.
        if let Err(err) = self.store.save(&event).await {
            error!(
                event_id = %metadata.event_id,
                kind = metadata.kind,
                error = %err,
                "failed to persist event"
            );
        }

        let entries: Vec<HandlerEntry<E>> = {
            let registry = self.registry.read().expect("handler registry lock poisoned");
            match registry.get(metadata.kind) {
                Some(entries) if !entries.is_empty() => entries.clone(),
                _ => {
                    debug!(event_id = %metadata.event_id, kind = metadata.kind, "no handlers registered");
                    return;
                }
            }
        };

        for entry in &entries {
            let name = entry.handler.name();
            match entry.handler.handle(&event).await {
                Ok(()) => {
                    debug!(event_id = %metadata.event_id, kind = metadata.kind, handler = name, "event handled");
                }
                Err(err) => {
                    error!(
                        event_id = %metadata.event_id,
                        kind = metadata.kind,
                        handler = name,
                        error = %err,
                        "handler failed, recording dead letter"
                    );
                    self.record_dead_letter(&event, &err).await;
                }
            }
        }

        self.processed
            .lock()
            .expect("processed window lock poisoned")
            .insert(metadata.event_id);
    }

    async fn record_dead_letter(&self, event: &E, err: &HandlerError) {
        let record = DeadLetterRecord {
            event: event.clone(),
            error_message: err.to_string(),
            timestamp: self.clock.now(),
        };
        if let Err(store_err) = self.store.save_dead_letter(record).await {
            error!(
                event_id = %event.event_id(),
                error = %store_err,
                "failed to persist dead letter record"
            );
        }
    }
}
