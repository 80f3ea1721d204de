//! Audit trail for authentication events.

use async_trait::async_trait;

use opendata_core::error::HandlerError;
use opendata_core::event::DomainEvent;
use opendata_core::handler::EventHandler;

use crate::events::AuthEvent;

/// Writes every authentication event to the audit log.
///
/// The handler is infallible: an event that reaches it is always
/// considered handled.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogHandler;

impl AuditLogHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler<AuthEvent> for AuditLogHandler {
    fn name(&self) -> &'static str {
        "audit-log"
    }

    async fn handle(&self, event: &AuthEvent) -> Result<(), HandlerError> {
        tracing::info!(
            target: "audit",
            kind = event.kind(),
            event_id = %event.event_id(),
            aggregate_id = %event.aggregate_id(),
            occurred_at = %event.occurred_at(),
            payload = %event.payload(),
            "auth event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use opendata_test_support::FixedClock;
    use uuid::Uuid;

    use crate::directory::Tier;
    use crate::events::{
        AuthEventKind, LoginFailed, LoginSucceeded, SuspiciousActivity, TokenRefreshed,
    };

    use super::*;

    #[tokio::test]
    async fn test_every_event_kind_is_accepted() {
        // Arrange
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let aggregate_id = Uuid::new_v4();
        let handler = AuditLogHandler::new();
        let kinds = vec![
            AuthEventKind::LoginSucceeded(LoginSucceeded {
                user_id: aggregate_id,
                username: "alice".to_string(),
                tier: Tier::Premium,
            }),
            AuthEventKind::LoginFailed(LoginFailed {
                username: "mallory".to_string(),
                reason: "invalid credentials".to_string(),
            }),
            AuthEventKind::TokenRefreshed(TokenRefreshed {
                user_id: aggregate_id,
                username: "alice".to_string(),
            }),
            AuthEventKind::SuspiciousActivity(SuspiciousActivity {
                username: "mallory".to_string(),
                failure_count: 5,
                window_secs: 300,
            }),
        ];

        // Act + Assert
        for kind in kinds {
            let event = AuthEvent::new(aggregate_id, kind, &clock);
            assert!(handler.handle(&event).await.is_ok());
        }
    }
}
