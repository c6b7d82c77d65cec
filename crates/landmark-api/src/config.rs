//! Server configuration loaded from the environment.

use std::path::PathBuf;

use landmark_core::defaults::{self, env_or};
use landmark_search::CallTimeouts;

/// Settings for the HTTP server and the pipeline it drives.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Directory shared with the matcher.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Comma-separated origins, or `*` for any.
    pub allowed_origins: String,
    pub search_radius_meters: f64,
    pub timeouts: CallTimeouts,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_origins: defaults::ALLOWED_ORIGINS.to_string(),
            search_radius_meters: defaults::SEARCH_RADIUS_METERS,
            timeouts: CallTimeouts::default(),
        }
    }
}

impl ApiConfig {
    /// Load from `HOST`, `PORT`, `DATABASE_URL`, `UPLOAD_DIR`,
    /// `MAX_UPLOAD_BYTES`, `ALLOWED_ORIGINS`, the search radius and the
    /// call timeouts. Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let fallback = Self::default();
        Self {
            host: env_or("HOST", fallback.host),
            port: env_or("PORT", fallback.port),
            database_url: env_or("DATABASE_URL", fallback.database_url),
            upload_dir: env_or("UPLOAD_DIR", fallback.upload_dir),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", fallback.max_upload_bytes),
            allowed_origins: env_or("ALLOWED_ORIGINS", fallback.allowed_origins),
            search_radius_meters: env_or(
                defaults::ENV_SEARCH_RADIUS_METERS,
                fallback.search_radius_meters,
            ),
            timeouts: CallTimeouts::from_env(),
        }
    }

    /// Request body limit: the largest image plus room for form fields.
    pub fn body_limit_bytes(&self) -> usize {
        (self.max_upload_bytes as usize).saturating_add(1024 * 1024)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.trim() == "*" || self.allowed_origins.trim().is_empty()
    }
}
