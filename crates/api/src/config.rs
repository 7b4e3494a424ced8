//! Application configuration
//!
//! All configuration is loaded once at startup into an explicit [`Config`]
//! struct and passed by reference from there — nothing reads the
//! environment during request handling.

use anyhow::bail;

use crate::auth::jwt::{parse_ttl, DEFAULT_TTL_SECONDS};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Secret for token signing. Required; startup fails without it.
    pub jwt_secret: String,
    /// Token lifetime, resolved from `JWT_EXPIRATION` at startup.
    pub jwt_ttl_seconds: i64,
    /// bcrypt work factor for new password hashes.
    pub password_hash_cost: u32,
    /// Minimum accepted password length at registration.
    pub password_min_length: usize,
    /// Admitted auth attempts per identifier within the window.
    pub auth_rate_limit: usize,
    /// Sliding-window length for auth rate limiting, in seconds.
    pub auth_rate_window_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => bail!("DATABASE_URL must be set"),
        };

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            bail!("JWT secret not configured. Please check your .env file.");
        }

        let raw_ttl = env_or("JWT_EXPIRATION", "24h");
        let jwt_ttl_seconds = match parse_ttl(&raw_ttl) {
            Some(seconds) => seconds,
            None => {
                tracing::warn!(
                    value = %raw_ttl,
                    fallback_seconds = DEFAULT_TTL_SECONDS,
                    "JWT_EXPIRATION is not parsable, falling back to 24h"
                );
                DEFAULT_TTL_SECONDS
            }
        };

        Ok(Self {
            database_url,
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8080"),
            jwt_secret,
            jwt_ttl_seconds,
            password_hash_cost: parsed_env_or("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST),
            password_min_length: parsed_env_or("PASSWORD_MIN_LENGTH", 6),
            auth_rate_limit: parsed_env_or("RATE_LIMIT_AUTH", 10),
            auth_rate_window_seconds: parsed_env_or("RATE_LIMIT_AUTH_WINDOW", 3600),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Reads a numeric variable, warning and defaulting when it does not parse.
fn parsed_env_or<T: std::str::FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(name, value = %raw, default = %default, "ignoring unparsable setting");
                default
            }
        },
        _ => default,
    }
}
