//! Centralized default constants for landmark.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.
//! Each value can be overridden by the environment variable named next to it.

// =============================================================================
// SEARCH
// =============================================================================

/// Radius around the query point in which reference images are candidates.
pub const SEARCH_RADIUS_METERS: f64 = 1000.0;

/// Env override for [`SEARCH_RADIUS_METERS`].
pub const ENV_SEARCH_RADIUS_METERS: &str = "LANDMARK_SEARCH_RADIUS_METERS";

/// Relative path prefix under which uploaded images are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Upper bound for a single store call made by the pipeline.
pub const STORE_TIMEOUT_SECS: u64 = 10;

/// Env override for [`STORE_TIMEOUT_SECS`].
pub const ENV_STORE_TIMEOUT_SECS: &str = "LANDMARK_STORE_TIMEOUT_SECS";

/// Upper bound for a single matcher call. Feature extraction is slow.
pub const MATCHER_TIMEOUT_SECS: u64 = 60;

/// Env override for [`MATCHER_TIMEOUT_SECS`].
pub const ENV_MATCHER_TIMEOUT_SECS: &str = "LANDMARK_MATCHER_TIMEOUT_SECS";

/// Timeout for the matcher health probe.
pub const MATCHER_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Matcher calls slower than this are logged as slow.
pub const MATCHER_SLOW_MS: u64 = 5_000;

// =============================================================================
// MATCHER
// =============================================================================

/// Base URL of the feature matcher service.
pub const MATCHER_URL: &str = "http://flask_cv:5000";

/// Env override for [`MATCHER_URL`].
pub const ENV_MATCHER_URL: &str = "MATCHER_URL";

// =============================================================================
// UPLOADS
// =============================================================================

/// Directory shared with the matcher where uploaded images are written.
pub const UPLOAD_DIR: &str = "/app/uploads";

/// Maximum accepted upload size in bytes (25 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Maximum number of taps accepted in one bulk registration.
pub const MAX_BULK_TAPS: usize = 256;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2_000;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/landmark";

/// Default CORS origin list. `*` allows any origin.
pub const ALLOWED_ORIGINS: &str = "*";

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Upper bound on pooled PostgreSQL connections (`DB_MAX_CONNECTIONS`).
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Connections kept open while idle (`DB_MIN_CONNECTIONS`).
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds to wait for a free connection (`DB_CONNECT_TIMEOUT_SECS`).
///
/// Must exceed [`STORE_TIMEOUT_SECS`]; the pipeline bound reports the timeout.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Seconds before an idle connection is closed (`DB_IDLE_TIMEOUT_SECS`).
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Seconds before a connection is recycled (`DB_MAX_LIFETIME_SECS`). `0` disables recycling.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

/// Read a numeric env override, falling back to `default` when unset or unparsable.
pub fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
