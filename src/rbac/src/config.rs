//! Environment-driven configuration

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Default role-cache TTL in seconds (one hour)
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Server configuration, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,

    /// PostgreSQL connection string (required)
    pub database_url: String,

    /// Redis connection string; unset runs with the in-process cache
    pub redis_url: Option<String>,

    /// HMAC secret for access tokens (required)
    pub jwt_secret: String,

    /// Lifetime for cached per-user role sets
    pub cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required; everything else has a
    /// default. `REDIS_URL` is optional; without it the server runs on the
    /// in-process role cache, which is fine for a single node.
    pub fn from_env() -> Result<Self> {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        let cache_ttl_secs: u64 = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Self {
            port,
            database_url,
            redis_url,
            jwt_secret,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }
}
