//! Login failure monitoring.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use opendata_core::clock::Clock;
use opendata_core::error::HandlerError;
use opendata_core::event::DomainEvent;
use opendata_core::handler::EventHandler;
use opendata_events::EventDispatcher;

use crate::events::{AuthEvent, AuthEventKind, SuspiciousActivity};

/// Tracks login failures per username and raises a
/// [`SuspiciousActivity`] event when they cross a threshold.
///
/// Failures older than the observation window are discarded before each
/// count. When the threshold is crossed the ledger for that username is
/// cleared, so the next alert requires a fresh run of failures. The
/// follow-up event is queued on the dispatcher, not handled inline, and
/// is delivered in the next dispatch cycle.
pub struct SecurityMonitorHandler {
    dispatcher: Weak<EventDispatcher<AuthEvent>>,
    clock: Arc<dyn Clock>,
    threshold: usize,
    window: Duration,
    failures: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SecurityMonitorHandler {
    /// Creates a monitor that alerts after `threshold` failures for the
    /// same username inside `window`.
    ///
    /// The dispatcher is held weakly so the monitor never keeps it
    /// alive on its own.
    #[must_use]
    pub fn new(
        dispatcher: Weak<EventDispatcher<AuthEvent>>,
        clock: Arc<dyn Clock>,
        threshold: usize,
        window: Duration,
    ) -> Self {
        Self {
            dispatcher,
            clock,
            threshold,
            window,
            failures: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl EventHandler<AuthEvent> for SecurityMonitorHandler {
    fn name(&self) -> &'static str {
        "security-monitor"
    }

    async fn handle(&self, event: &AuthEvent) -> Result<(), HandlerError> {
        let AuthEventKind::LoginFailed(failed) = event.data() else {
            return Ok(());
        };

        let now = self.clock.now();
        let crossed = {
            let mut failures = self.failures.lock().expect("failure ledger lock poisoned");
            let attempts = failures.entry(failed.username.clone()).or_default();
            let cutoff = now - self.window;
            attempts.retain(|at| *at > cutoff);
            attempts.push(now);
            if attempts.len() >= self.threshold {
                let count = attempts.len();
                failures.remove(&failed.username);
                Some(count)
            } else {
                None
            }
        };

        let Some(failure_count) = crossed else {
            return Ok(());
        };
        let window_secs = self.window.num_seconds();
        warn!(
            username = %failed.username,
            failure_count,
            window_secs,
            "login failure threshold crossed"
        );

        let Some(dispatcher) = self.dispatcher.upgrade() else {
            debug!("dispatcher is gone, dropping suspicious activity event");
            return Ok(());
        };
        dispatcher.publish(AuthEvent::new(
            event.aggregate_id(),
            AuthEventKind::SuspiciousActivity(SuspiciousActivity {
                username: failed.username.clone(),
                failure_count,
                window_secs,
            }),
            self.clock.as_ref(),
        ));
        Ok(())
    }
}
