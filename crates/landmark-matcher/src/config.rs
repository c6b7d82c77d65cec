//! Matcher client configuration.

use std::time::Duration;

use landmark_core::defaults::{self, env_or};

/// Connection settings for the feature matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Bound applied to every register and query request.
    pub timeout: Duration,
    /// Bound applied to the health probe.
    pub health_timeout: Duration,
    /// Calls slower than this are logged with `slow = true`.
    pub slow_threshold: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::MATCHER_URL.to_string(),
            timeout: Duration::from_secs(defaults::MATCHER_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(defaults::MATCHER_HEALTH_TIMEOUT_SECS),
            slow_threshold: Duration::from_millis(defaults::MATCHER_SLOW_MS),
        }
    }
}

impl MatcherConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Load from `MATCHER_URL` and `LANDMARK_MATCHER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url = std::env::var(defaults::ENV_MATCHER_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::MATCHER_URL.to_string());
        let timeout_secs = env_or(
            defaults::ENV_MATCHER_TIMEOUT_SECS,
            defaults::MATCHER_TIMEOUT_SECS,
        );

        Self::new(base_url).with_timeout(Duration::from_secs(timeout_secs))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_compose_service() {
        let config = MatcherConfig::default();
        assert_eq!(config.base_url, "http://flask_cv:5000");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = MatcherConfig::new("http://localhost:5000/");
        assert_eq!(config.endpoint("/process"), "http://localhost:5000/process");
    }
}
