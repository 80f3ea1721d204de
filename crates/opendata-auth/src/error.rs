//! Authentication errors.

use thiserror::Error;

/// Failures raised by credential checks and token operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately the same variant
    /// for both, so callers cannot learn which usernames exist.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token could not be decoded, or its signature or issuer is wrong.
    #[error("token invalid")]
    TokenInvalid,

    /// The token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// The token was revoked.
    #[error("token revoked")]
    TokenRevoked,

    /// The token kind does not fit the operation.
    #[error("wrong token kind for this operation")]
    WrongTokenKind,

    /// Token signing failed.
    #[error("token creation failed: {0}")]
    TokenCreation(String),
}
