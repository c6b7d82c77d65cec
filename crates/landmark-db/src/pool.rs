//! PostgreSQL pool setup and health reporting.
//!
//! Every knob comes from the environment, with defaults in
//! [`landmark_core::defaults`]:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DB_MAX_CONNECTIONS` | 10 |
//! | `DB_MIN_CONNECTIONS` | 1 |
//! | `DB_CONNECT_TIMEOUT_SECS` | 30 |
//! | `DB_IDLE_TIMEOUT_SECS` | 600 |
//! | `DB_MAX_LIFETIME_SECS` | 1800 (`0` disables recycling) |

use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use landmark_core::defaults;
use landmark_core::{Error, Result};

/// Settings for the shared connection pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// `None` keeps connections for the life of the process.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            min_connections: defaults::DB_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
            max_lifetime: lifetime(defaults::DB_MAX_LIFETIME_SECS),
        }
    }
}

fn lifetime(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl PoolConfig {
    /// Read every `DB_*` variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset or unparsable values
    /// keep their default, and `min_connections` is capped at `max_connections`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
            raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        }

        let max_connections = parse(
            lookup("DB_MAX_CONNECTIONS"),
            defaults::DB_MAX_CONNECTIONS,
        )
        .max(1);
        let min_connections =
            parse(lookup("DB_MIN_CONNECTIONS"), defaults::DB_MIN_CONNECTIONS).min(max_connections);

        Self {
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(parse(
                lookup("DB_CONNECT_TIMEOUT_SECS"),
                defaults::DB_CONNECT_TIMEOUT_SECS,
            )),
            idle_timeout: Duration::from_secs(parse(
                lookup("DB_IDLE_TIMEOUT_SECS"),
                defaults::DB_IDLE_TIMEOUT_SECS,
            )),
            max_lifetime: lifetime(parse(
                lookup("DB_MAX_LIFETIME_SECS"),
                defaults::DB_MAX_LIFETIME_SECS,
            )),
        }
    }
}

/// Open the pool and wait for the first connection.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout);
    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(max_lifetime);
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Pool occupancy reported on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
}

impl PoolStats {
    /// Every open connection is checked out.
    pub fn exhausted(&self) -> bool {
        self.size > 0 && self.idle == 0
    }
}

/// Snapshot the pool, warning when no connection is idle.
pub fn pool_stats(pool: &PgPool) -> PoolStats {
    let stats = PoolStats {
        size: pool.size(),
        idle: pool.num_idle() as u32,
    };
    if stats.exhausted() {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = stats.size,
            "No idle database connections"
        );
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = PoolConfig::from_lookup(|_| None);
        assert_eq!(config, PoolConfig::default());
        assert_eq!(config.max_lifetime, Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_every_knob_is_read() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "25"),
            ("DB_MIN_CONNECTIONS", "5"),
            ("DB_CONNECT_TIMEOUT_SECS", "45"),
            ("DB_IDLE_TIMEOUT_SECS", "120"),
            ("DB_MAX_LIFETIME_SECS", "900"),
        ]));

        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(45));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.max_lifetime, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_zero_lifetime_disables_recycling() {
        let config = PoolConfig::from_lookup(lookup_from(&[("DB_MAX_LIFETIME_SECS", "0")]));
        assert_eq!(config.max_lifetime, None);
    }

    #[test]
    fn test_min_capped_and_garbage_ignored() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_MIN_CONNECTIONS", "9"),
            ("DB_IDLE_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.min_connections, 4);
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_exhausted() {
        assert!(PoolStats { size: 3, idle: 0 }.exhausted());
        assert!(!PoolStats { size: 3, idle: 1 }.exhausted());
        assert!(!PoolStats { size: 0, idle: 0 }.exhausted());
    }
}
