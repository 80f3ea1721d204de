//! Access and refresh token issuance and verification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opendata_core::clock::Clock;

use crate::directory::Tier;
use crate::error::AuthError;

/// Whether a token grants API access or only a refresh exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The account identifier.
    pub sub: Uuid,
    /// The account username.
    pub username: String,
    /// The account's subscription tier.
    pub tier: Tier,
    /// Access or refresh.
    pub kind: TokenKind,
    /// Expiry as unix seconds.
    pub exp: i64,
    /// Issued-at as unix seconds.
    pub iat: i64,
    /// Issuer name.
    pub iss: String,
    /// Token identifier, the unit of revocation.
    pub jti: String,
}

/// An access/refresh pair as returned to clients.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

/// Issues and verifies HMAC-signed tokens.
///
/// Expiry is enforced against the injected clock rather than the system
/// clock, so token lifetimes are testable.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
    /// Revoked token identifiers, each kept until the token's expiry.
    revoked: Mutex<HashMap<String, i64>>,
}

impl TokenService {
    #[must_use]
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_ttl,
            refresh_ttl,
            clock,
            revoked: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a fresh access/refresh pair for an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenCreation`] when signing fails.
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        username: &str,
        tier: Tier,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.issue(user_id, username, tier, TokenKind::Access, self.access_ttl)?;
        let refresh_token =
            self.issue(user_id, username, tier, TokenKind::Refresh, self.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verifies a token of the expected kind and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenInvalid`] for undecodable tokens and
    /// signature or issuer mismatches, [`AuthError::TokenExpired`] past
    /// expiry, [`AuthError::WrongTokenKind`] on an access/refresh mix-up
    /// and [`AuthError::TokenRevoked`] after revocation.
    ///
    /// # Panics
    ///
    /// Panics if the revocation set lock is poisoned.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        // Expiry is enforced below against the injected clock.
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::TokenInvalid)?;
        let claims = data.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind);
        }
        if self
            .revoked
            .lock()
            .expect("revocation set lock poisoned")
            .contains_key(&claims.jti)
        {
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a fresh pair.
    ///
    /// The presented refresh token is revoked, so it cannot be replayed.
    /// Returns the new pair together with the claims of the presented
    /// token.
    ///
    /// # Errors
    ///
    /// Propagates the verification errors of [`TokenService::verify`].
    pub fn refresh(&self, refresh_token: &str) -> Result<(TokenPair, Claims), AuthError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.revoke(&claims.jti, claims.exp);
        let pair = self.issue_pair(claims.sub, &claims.username, claims.tier)?;
        Ok((pair, claims))
    }

    /// Revokes a token by its identifier until the given expiry.
    ///
    /// Each call sweeps out entries whose tokens have expired since;
    /// verification rejects those tokens as expired before the revocation
    /// lookup, so dropping them changes nothing.
    ///
    /// # Panics
    ///
    /// Panics if the revocation set lock is poisoned.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        let now = self.clock.now().timestamp();
        let mut revoked = self.revoked.lock().expect("revocation set lock poisoned");
        revoked.retain(|_, expiry| *expiry > now);
        revoked.insert(jti.to_string(), expires_at);
    }

    fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        tier: Tier,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            tier,
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AuthError::TokenCreation(err.to_string()))
    }
}
