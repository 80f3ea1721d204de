//! Operator alerting for suspicious activity.

use async_trait::async_trait;
use tracing::error;

use opendata_core::error::HandlerError;
use opendata_core::handler::EventHandler;

use crate::events::{AuthEvent, AuthEventKind};

/// Surfaces [`SuspiciousActivity`](crate::events::SuspiciousActivity)
/// events at error level so they reach whatever sink operators watch.
/// All other event kinds pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertHandler;

impl AlertHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler<AuthEvent> for AlertHandler {
    fn name(&self) -> &'static str {
        "alert"
    }

    async fn handle(&self, event: &AuthEvent) -> Result<(), HandlerError> {
        let AuthEventKind::SuspiciousActivity(alert) = event.data() else {
            return Ok(());
        };
        error!(
            username = %alert.username,
            failure_count = alert.failure_count,
            window_secs = alert.window_secs,
            "suspicious login activity detected"
        );
        Ok(())
    }
}
