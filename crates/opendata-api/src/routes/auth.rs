//! Authentication routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use opendata_auth::directory::user_id_for;
use opendata_auth::error::AuthError;
use opendata_auth::events::{
    AuthEvent, AuthEventKind, LoginFailed, LoginSucceeded, TokenRefreshed,
};
use opendata_auth::token::TokenPair;

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

/// Request body for POST /login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// The account username.
    pub username: String,
    /// The account password.
    pub password: String,
}

/// Request body for POST /refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token to exchange.
    pub refresh_token: String,
}

/// Response body carrying a fresh token pair.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Bearer token for API access.
    pub access_token: String,
    /// Token for the refresh exchange.
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }
    }
}

/// POST /login
#[instrument(skip(state, request), fields(username = %request.username))]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state
        .users
        .verify_credentials(&request.username, &request.password)
    {
        Ok(account) => {
            let pair =
                state
                    .tokens
                    .issue_pair(account.user_id, &account.username, account.tier)?;
            state.dispatcher.publish(AuthEvent::new(
                account.user_id,
                AuthEventKind::LoginSucceeded(LoginSucceeded {
                    user_id: account.user_id,
                    username: account.username.clone(),
                    tier: account.tier,
                }),
                state.clock.as_ref(),
            ));
            info!("login succeeded");
            Ok(Json(TokenResponse::from(pair)))
        }
        Err(AuthError::InvalidCredentials) => {
            state.dispatcher.publish(AuthEvent::new(
                user_id_for(&request.username),
                AuthEventKind::LoginFailed(LoginFailed {
                    username: request.username.clone(),
                    reason: "invalid credentials".to_string(),
                }),
                state.clock.as_ref(),
            ));
            info!("login rejected");
            Err(ApiError::Unauthorized("invalid credentials".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// POST /refresh
#[instrument(skip(state, request))]
async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let (pair, claims) = state.tokens.refresh(&request.refresh_token)?;
    state.dispatcher.publish(AuthEvent::new(
        claims.sub,
        AuthEventKind::TokenRefreshed(TokenRefreshed {
            user_id: claims.sub,
            username: claims.username.clone(),
        }),
        state.clock.as_ref(),
    ));
    info!(username = %claims.username, "token refreshed");
    Ok(Json(TokenResponse::from(pair)))
}

/// POST /logout
#[instrument(skip(state, user), fields(username = %user.username))]
async fn logout(State(state): State<AppState>, user: AuthenticatedUser) -> StatusCode {
    state.tokens.revoke(&user.token_id, user.token_expires_at);
    info!("logged out");
    StatusCode::NO_CONTENT
}

/// Returns the router for the authentication context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}
