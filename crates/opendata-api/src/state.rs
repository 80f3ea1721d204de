//! Shared application state.

use std::sync::Arc;

use opendata_auth::directory::UserDirectory;
use opendata_auth::events::{
    AuthEvent, LOGIN_FAILED_KIND, LOGIN_SUCCEEDED_KIND, SUSPICIOUS_ACTIVITY_KIND,
    TOKEN_REFRESHED_KIND,
};
use opendata_auth::handlers::{AlertHandler, AuditLogHandler, SecurityMonitorHandler};
use opendata_auth::token::TokenService;
use opendata_core::clock::Clock;
use opendata_event_store::MemoryEventStore;
use opendata_events::EventDispatcher;

use crate::cache::DataCache;
use crate::config::Config;
use crate::quota::{RateLimiter, TierLimits};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Provisioned accounts.
    pub users: Arc<UserDirectory>,
    /// Token issuance and verification.
    pub tokens: Arc<TokenService>,
    /// The event dispatcher; route handlers publish into it.
    pub dispatcher: Arc<EventDispatcher<AuthEvent>>,
    /// The store behind the dispatcher, exposed for health reporting.
    pub event_store: Arc<MemoryEventStore<AuthEvent>>,
    /// Cached data files.
    pub data_cache: Arc<DataCache>,
    /// Per-user fixed-window rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
    /// Time source shared by every component.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the full application from configuration.
    ///
    /// Seeds the user directory, constructs the token service, event
    /// store and dispatcher, and subscribes the reactive handlers: the
    /// audit log on every kind (priority 10), the security monitor on
    /// login failures (priority 5) and alerting on suspicious activity
    /// (priority 0).
    #[must_use]
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let mut directory = UserDirectory::new();
        for (username, password, tier) in &config.users {
            directory.insert(username, password, *tier);
        }

        let tokens = Arc::new(TokenService::new(
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
            clock.clone(),
        ));

        let event_store: Arc<MemoryEventStore<AuthEvent>> = Arc::new(MemoryEventStore::new());
        let dispatcher: Arc<EventDispatcher<AuthEvent>> =
            Arc::new(EventDispatcher::new(event_store.clone(), clock.clone()));

        let audit = Arc::new(AuditLogHandler::new());
        for kind in [
            LOGIN_SUCCEEDED_KIND,
            LOGIN_FAILED_KIND,
            TOKEN_REFRESHED_KIND,
            SUSPICIOUS_ACTIVITY_KIND,
        ] {
            dispatcher.subscribe(kind, audit.clone(), 10);
        }
        let monitor = Arc::new(SecurityMonitorHandler::new(
            Arc::downgrade(&dispatcher),
            clock.clone(),
            config.failure_threshold,
            config.failure_window,
        ));
        dispatcher.subscribe(LOGIN_FAILED_KIND, monitor, 5);
        dispatcher.subscribe(SUSPICIOUS_ACTIVITY_KIND, Arc::new(AlertHandler::new()), 0);

        let data_cache = Arc::new(DataCache::new(
            config.data_dir.clone(),
            config.cache_ttl,
            clock.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            TierLimits {
                free: config.rate_limit_free,
                basic: config.rate_limit_basic,
                premium: config.rate_limit_premium,
            },
            clock.clone(),
        ));

        Self {
            users: Arc::new(directory),
            tokens,
            dispatcher,
            event_store,
            data_cache,
            rate_limiter,
            clock,
        }
    }
}
