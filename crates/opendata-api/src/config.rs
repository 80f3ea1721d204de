//! Environment-driven configuration.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use opendata_auth::directory::Tier;

use crate::error::AppError;

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Root directory for served data files.
    pub data_dir: PathBuf,
    /// HMAC secret for token signing.
    pub jwt_secret: String,
    /// Issuer claim stamped into every token.
    pub jwt_issuer: String,
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_token_ttl: Duration,
    /// Requests per minute for the free tier.
    pub rate_limit_free: u32,
    /// Requests per minute for the basic tier.
    pub rate_limit_basic: u32,
    /// Requests per minute for the premium tier.
    pub rate_limit_premium: u32,
    /// How long a cached data file is trusted before revalidation.
    pub cache_ttl: Duration,
    /// How often the background pump dispatches pending events.
    pub dispatch_interval: StdDuration,
    /// Login failures per username inside the window before an alert.
    pub failure_threshold: usize,
    /// Width of the login failure observation window.
    pub failure_window: Duration,
    /// Seeded accounts as (username, password, tier).
    pub users: Vec<(String, String, Tier)>,
}

impl Config {
    /// Reads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a required variable is missing
    /// or a value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| {
            AppError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parsed_env("PORT", 3000)?,
            data_dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            jwt_secret,
            jwt_issuer: env_or("JWT_ISSUER", "opendata-api"),
            access_token_ttl: Duration::seconds(parsed_env("ACCESS_TOKEN_TTL_SECS", 900)?),
            refresh_token_ttl: Duration::seconds(parsed_env("REFRESH_TOKEN_TTL_SECS", 86_400)?),
            rate_limit_free: parsed_env("RATE_LIMIT_FREE", 10)?,
            rate_limit_basic: parsed_env("RATE_LIMIT_BASIC", 60)?,
            rate_limit_premium: parsed_env("RATE_LIMIT_PREMIUM", 600)?,
            cache_ttl: Duration::seconds(parsed_env("CACHE_TTL_SECS", 60)?),
            dispatch_interval: StdDuration::from_millis(parsed_env("DISPATCH_INTERVAL_MS", 250)?),
            failure_threshold: parsed_env("FAILURE_THRESHOLD", 5)?,
            failure_window: Duration::seconds(parsed_env("FAILURE_WINDOW_SECS", 300)?),
            users: parse_users(&std::env::var("USERS").unwrap_or_default())?,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| AppError::Config(format!("{name} is invalid: {err}"))),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated `username:password:tier` account list.
fn parse_users(raw: &str) -> Result<Vec<(String, String, Tier)>, AppError> {
    let mut users = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':');
        let (Some(username), Some(password), Some(tier)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::Config(format!(
                "USERS entry {entry:?} must be username:password:tier"
            )));
        };
        let Some(tier) = Tier::parse(tier) else {
            return Err(AppError::Config(format!(
                "USERS entry {entry:?} has an unknown tier"
            )));
        };
        users.push((username.to_string(), password.to_string(), tier));
    }
    Ok(users)
}
