//! Bearer token extraction.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use opendata_auth::directory::Tier;
use opendata_auth::token::TokenKind;

use crate::error::ApiError;
use crate::state::AppState;

/// The verified identity of the calling account.
///
/// Middleware that has already verified the token stashes the identity
/// in the request extensions; the extractor reuses it instead of
/// verifying twice.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Stable account identifier.
    pub user_id: Uuid,
    /// The account username.
    pub username: String,
    /// The account's subscription tier.
    pub tier: Tier,
    /// The presented token's identifier, the unit of revocation.
    pub token_id: String,
    /// The presented token's expiry as unix seconds.
    pub token_expires_at: i64,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("authorization scheme must be Bearer".to_string())
        })?;

        let claims = state.tokens.verify(token, TokenKind::Access)?;
        Ok(Self {
            user_id: claims.sub,
            username: claims.username,
            tier: claims.tier,
            token_id: claims.jti,
            token_expires_at: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use axum::http::Request;
    use chrono::{Duration, TimeZone, Utc};
    use opendata_auth::directory::user_id_for;
    use opendata_test_support::FixedClock;

    use crate::config::Config;

    use super::*;

    fn test_state() -> AppState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: std::env::temp_dir(),
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "opendata-test".to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(1),
            rate_limit_free: 10,
            rate_limit_basic: 60,
            rate_limit_premium: 600,
            cache_ttl: Duration::seconds(60),
            dispatch_interval: StdDuration::from_millis(250),
            failure_threshold: 5,
            failure_window: Duration::seconds(300),
            users: vec![(
                "alice".to_string(),
                "wonderland".to_string(),
                Tier::Premium,
            )],
        };
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        AppState::from_config(&config, clock)
    }

    fn parts_with_authorization(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_valid_bearer_token_is_accepted() {
        // Arrange
        let state = test_state();
        let pair = state
            .tokens
            .issue_pair(user_id_for("alice"), "alice", Tier::Premium)
            .unwrap();
        let mut parts =
            parts_with_authorization(Some(&format!("Bearer {}", pair.access_token)));

        // Act
        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        // Assert
        assert_eq!(user.user_id, user_id_for("alice"));
        assert_eq!(user.username, "alice");
        assert_eq!(user.tier, Tier::Premium);
        assert!(!user.token_id.is_empty());
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let state = test_state();
        let mut parts = parts_with_authorization(None);

        let result = AuthenticatedUser::from_request_parts(&mut parts, &state).await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let state = test_state();
        let mut parts = parts_with_authorization(Some("Basic YWxpY2U6d29uZGVybGFuZA=="));

        let result = AuthenticatedUser::from_request_parts(&mut parts, &state).await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_is_rejected_for_api_access() {
        let state = test_state();
        let pair = state
            .tokens
            .issue_pair(user_id_for("alice"), "alice", Tier::Premium)
            .unwrap();
        let mut parts =
            parts_with_authorization(Some(&format!("Bearer {}", pair.refresh_token)));

        let result = AuthenticatedUser::from_request_parts(&mut parts, &state).await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_identity_from_extensions_short_circuits() {
        // Arrange: no Authorization header, identity already stashed.
        let state = test_state();
        let mut parts = parts_with_authorization(None);
        parts.extensions.insert(AuthenticatedUser {
            user_id: user_id_for("alice"),
            username: "alice".to_string(),
            tier: Tier::Premium,
            token_id: "stashed".to_string(),
            token_expires_at: 0,
        });

        // Act
        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        // Assert
        assert_eq!(user.token_id, "stashed");
    }
}
