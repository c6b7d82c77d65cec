//! Time bounds for store and matcher calls.

use std::future::Future;
use std::time::Duration;

use landmark_core::defaults::{self, env_or};
use landmark_core::{Error, Result};

/// Per-kind limits applied to every external call the pipeline makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub store: Duration,
    pub matcher: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(defaults::STORE_TIMEOUT_SECS),
            matcher: Duration::from_secs(defaults::MATCHER_TIMEOUT_SECS),
        }
    }
}

impl CallTimeouts {
    /// Load from `LANDMARK_STORE_TIMEOUT_SECS` and `LANDMARK_MATCHER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self {
            store: Duration::from_secs(env_or(
                defaults::ENV_STORE_TIMEOUT_SECS,
                defaults::STORE_TIMEOUT_SECS,
            )),
            matcher: Duration::from_secs(env_or(
                defaults::ENV_MATCHER_TIMEOUT_SECS,
                defaults::MATCHER_TIMEOUT_SECS,
            )),
        }
    }

    pub fn with_store(mut self, limit: Duration) -> Self {
        self.store = limit;
        self
    }

    pub fn with_matcher(mut self, limit: Duration) -> Self {
        self.matcher = limit;
        self
    }
}

/// Run `fut`, failing with [`Error::Timeout`] if it does not finish within `limit`.
///
/// The future is dropped on expiry; nothing is retried.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation,
            after_ms: limit.as_millis() as u64,
        }),
    }
}
