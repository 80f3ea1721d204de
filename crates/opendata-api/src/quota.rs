//! Tiered rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use opendata_auth::directory::Tier;
use opendata_core::clock::Clock;

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

/// Window length for the fixed-window counters.
const WINDOW_SECS: i64 = 60;

/// Requests-per-minute budgets per subscription tier.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    pub free: u32,
    pub basic: u32,
    pub premium: u32,
}

impl TierLimits {
    fn for_tier(self, tier: Tier) -> u32 {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Premium => self.premium,
        }
    }
}

/// Outcome of counting one request against an account's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at: i64,
    },
    Denied {
        limit: u32,
        retry_after: i64,
        reset_at: i64,
    },
}

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counter per account.
pub struct RateLimiter {
    limits: TierLimits,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<Uuid, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limits: TierLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            limits,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request against the account's current window.
    ///
    /// # Panics
    ///
    /// Panics if the window map lock is poisoned.
    pub fn check(&self, user_id: Uuid, tier: Tier) -> Decision {
        let limit = self.limits.for_tier(tier);
        let now = self.clock.now();
        let mut windows = self
            .windows
            .lock()
            .expect("rate limit window lock poisoned");
        let window = windows.entry(user_id).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now - window.started_at >= Duration::seconds(WINDOW_SECS) {
            window.started_at = now;
            window.count = 0;
        }
        let reset_at = (window.started_at + Duration::seconds(WINDOW_SECS)).timestamp();

        if window.count >= limit {
            let retry_after = (reset_at - now.timestamp()).max(1);
            return Decision::Denied {
                limit,
                retry_after,
                reset_at,
            };
        }
        window.count += 1;
        Decision::Allowed {
            limit,
            remaining: limit - window.count,
            reset_at,
        }
    }
}

/// Middleware for the data routes: verifies the bearer token, counts
/// the request and stamps `X-RateLimit-*` headers on the response. The
/// verified identity is stashed in the request extensions for the
/// handler behind it.
///
/// # Errors
///
/// Returns 401 for missing or invalid tokens and 429 past the budget.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let user = AuthenticatedUser::from_request_parts(&mut parts, &state).await?;

    match state.rate_limiter.check(user.user_id, user.tier) {
        Decision::Denied {
            limit,
            retry_after,
            reset_at,
        } => {
            tracing::warn!(username = %user.username, limit, "rate limit exceeded");
            Err(ApiError::RateLimited {
                limit,
                retry_after,
                reset_at,
            })
        }
        Decision::Allowed {
            limit,
            remaining,
            reset_at,
        } => {
            let mut request = Request::from_parts(parts, body);
            request.extensions_mut().insert(user);
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(limit),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(reset_at),
            );
            Ok(response)
        }
    }
}
