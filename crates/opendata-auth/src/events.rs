//! Domain events for the authentication context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opendata_core::clock::Clock;
use opendata_core::event::DomainEvent;

use crate::directory::Tier;

/// Emitted when a login attempt succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSucceeded {
    /// The account identifier.
    pub user_id: Uuid,
    /// The account username.
    pub username: String,
    /// The account's subscription tier.
    pub tier: Tier,
}

/// Emitted when a login attempt is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFailed {
    /// The username the attempt was made for.
    pub username: String,
    /// Why the attempt was rejected.
    pub reason: String,
}

/// Emitted when a refresh token is exchanged for a new pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefreshed {
    /// The account identifier.
    pub user_id: Uuid,
    /// The account username.
    pub username: String,
}

/// Emitted when repeated login failures cross the monitoring threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    /// The username the failures were recorded for.
    pub username: String,
    /// How many failures fell inside the window.
    pub failure_count: usize,
    /// The width of the observation window in seconds.
    pub window_secs: i64,
}

/// Event kind identifier for [`LoginSucceeded`].
pub const LOGIN_SUCCEEDED_KIND: &str = "auth.login_succeeded";

/// Event kind identifier for [`LoginFailed`].
pub const LOGIN_FAILED_KIND: &str = "auth.login_failed";

/// Event kind identifier for [`TokenRefreshed`].
pub const TOKEN_REFRESHED_KIND: &str = "auth.token_refreshed";

/// Event kind identifier for [`SuspiciousActivity`].
pub const SUSPICIOUS_ACTIVITY_KIND: &str = "auth.suspicious_activity";

/// Event payload variants for the authentication context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuthEventKind {
    /// A login attempt succeeded.
    LoginSucceeded(LoginSucceeded),
    /// A login attempt was rejected.
    LoginFailed(LoginFailed),
    /// A refresh token was exchanged.
    TokenRefreshed(TokenRefreshed),
    /// Login failures crossed the monitoring threshold.
    SuspiciousActivity(SuspiciousActivity),
}

/// Domain event envelope for the authentication context.
///
/// Identity fields are fixed at construction; the event carries no
/// mutators.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    event_id: Uuid,
    aggregate_id: Uuid,
    occurred_at: DateTime<Utc>,
    kind: AuthEventKind,
}

impl AuthEvent {
    /// Creates an event for the given account stream, stamped by `clock`.
    #[must_use]
    pub fn new(aggregate_id: Uuid, kind: AuthEventKind, clock: &dyn Clock) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            occurred_at: clock.now(),
            kind,
        }
    }

    /// The variant-specific payload.
    pub fn data(&self) -> &AuthEventKind {
        &self.kind
    }
}

impl DomainEvent for AuthEvent {
    fn kind(&self) -> &'static str {
        match &self.kind {
            AuthEventKind::LoginSucceeded(_) => LOGIN_SUCCEEDED_KIND,
            AuthEventKind::LoginFailed(_) => LOGIN_FAILED_KIND,
            AuthEventKind::TokenRefreshed(_) => TOKEN_REFRESHED_KIND,
            AuthEventKind::SuspiciousActivity(_) => SUSPICIOUS_ACTIVITY_KIND,
        }
    }

    fn payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("AuthEventKind serialization is infallible")
    }

    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
