//! Mock matcher client for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use landmark_core::{Match, MatchClient, TreeId};
//! use landmark_matcher::mock::MockMatchClient;
//!
//! #[tokio::test]
//! async fn test_with_mock_matcher() {
//!     let matcher = MockMatchClient::new()
//!         .with_tree_id(Some(TreeId::new("tree-1")))
//!         .with_matches(vec![Match::new("kp-1", 0.9)]);
//!
//!     let reg = matcher.register("a.jpg", 1.0, 2.0).await.unwrap();
//!     assert_eq!(reg.keypoint_id.as_str(), "kp-1");
//!     assert_eq!(matcher.register_call_count(), 1);
//! }
//! ```

use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use landmark_core::{Error, KeypointId, Match, MatchClient, Registration, Result, TreeId};

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Register { filename: String, x: f64, y: f64 },
    Query { filename: String, tree_ids: Vec<TreeId> },
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_tree_id: Option<TreeId>,
    matches: Vec<Match>,
    fail_register_at: Option<usize>,
    fail_queries: bool,
    latency: Duration,
    failure_rate: f64,
    healthy: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_tree_id: Some(TreeId::new("tree-1")),
            matches: Vec::new(),
            fail_register_at: None,
            fail_queries: false,
            latency: Duration::ZERO,
            failure_rate: 0.0,
            healthy: true,
        }
    }
}

/// Scripted [`MatchClient`] that records every call.
///
/// Registrations without a scripted answer get keypoint `kp-{n}` (n counts
/// register calls from 1) and the configured default tree id.
#[derive(Clone, Default)]
pub struct MockMatchClient {
    config: Arc<MockConfig>,
    scripted: Arc<Mutex<VecDeque<Registration>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockMatchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree id returned by unscripted registrations.
    pub fn with_tree_id(mut self, tree_id: Option<TreeId>) -> Self {
        Arc::make_mut(&mut self.config).default_tree_id = tree_id;
        self
    }

    /// Answers for the next register calls, consumed in order.
    pub fn with_registrations(self, registrations: Vec<Registration>) -> Self {
        lock(&self.scripted).extend(registrations);
        self
    }

    /// Ranked answer returned by every query.
    pub fn with_matches(mut self, matches: Vec<Match>) -> Self {
        Arc::make_mut(&mut self.config).matches = matches;
        self
    }

    /// Fail the `n`th register call (1-based).
    pub fn fail_register_at(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config).fail_register_at = Some(n);
        self
    }

    /// Fail every query call.
    pub fn fail_queries(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_queries = true;
        self
    }

    /// Simulated latency for register and query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        Arc::make_mut(&mut self.config).latency = latency;
        self
    }

    /// Random failure rate (0.0 - 1.0) for register and query.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_healthy(mut self, healthy: bool) -> Self {
        Arc::make_mut(&mut self.config).healthy = healthy;
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.call_log).clone()
    }

    pub fn register_call_count(&self) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| matches!(c, MockCall::Register { .. }))
            .count()
    }

    pub fn query_call_count(&self) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| matches!(c, MockCall::Query { .. }))
            .count()
    }

    /// Tree id lists received by query calls, in call order.
    pub fn queried_tree_ids(&self) -> Vec<Vec<TreeId>> {
        lock(&self.call_log)
            .iter()
            .filter_map(|c| match c {
                MockCall::Query { tree_ids, .. } => Some(tree_ids.clone()),
                MockCall::Register { .. } => None,
            })
            .collect()
    }

    async fn simulate(&self, operation: &str) -> Result<()> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if self.config.failure_rate > 0.0
            && rand::thread_rng().gen::<f64>() < self.config.failure_rate
        {
            return Err(Error::Matcher(format!("mock {} failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl MatchClient for MockMatchClient {
    async fn register(&self, filename: &str, x: f64, y: f64) -> Result<Registration> {
        let call_number = {
            let mut log = lock(&self.call_log);
            log.push(MockCall::Register {
                filename: filename.to_string(),
                x,
                y,
            });
            log.iter()
                .filter(|c| matches!(c, MockCall::Register { .. }))
                .count()
        };

        self.simulate("register").await?;

        if self.config.fail_register_at == Some(call_number) {
            return Err(Error::Matcher(format!(
                "mock register failure at call {}",
                call_number
            )));
        }

        if let Some(scripted) = lock(&self.scripted).pop_front() {
            return Ok(scripted);
        }
        Ok(Registration {
            keypoint_id: KeypointId::new(format!("kp-{}", call_number)),
            tree_id: self.config.default_tree_id.clone(),
        })
    }

    async fn query(&self, filename: &str, tree_ids: &[TreeId]) -> Result<Vec<Match>> {
        lock(&self.call_log).push(MockCall::Query {
            filename: filename.to_string(),
            tree_ids: tree_ids.to_vec(),
        });

        self.simulate("query").await?;

        if self.config.fail_queries {
            return Err(Error::Matcher("mock query failure".to_string()));
        }
        Ok(self.config.matches.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_registrations_count_up() {
        let matcher = MockMatchClient::new();
        let a = matcher.register("a.jpg", 1.0, 2.0).await.unwrap();
        let b = matcher.register("a.jpg", 3.0, 4.0).await.unwrap();
        assert_eq!(a.keypoint_id.as_str(), "kp-1");
        assert_eq!(b.keypoint_id.as_str(), "kp-2");
        assert_eq!(a.tree_id, Some(TreeId::new("tree-1")));
        assert_eq!(matcher.register_call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_registrations_consumed_in_order() {
        let matcher = MockMatchClient::new().with_registrations(vec![Registration {
            keypoint_id: KeypointId::new("first"),
            tree_id: None,
        }]);
        let a = matcher.register("a.jpg", 0.0, 0.0).await.unwrap();
        let b = matcher.register("a.jpg", 0.0, 0.0).await.unwrap();
        assert_eq!(a.keypoint_id.as_str(), "first");
        assert!(a.tree_id.is_none());
        assert_eq!(b.keypoint_id.as_str(), "kp-2");
    }

    #[tokio::test]
    async fn test_fail_register_at() {
        let matcher = MockMatchClient::new().fail_register_at(2);
        assert!(matcher.register("a.jpg", 0.0, 0.0).await.is_ok());
        let err = matcher.register("a.jpg", 0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, Error::Matcher(_)));
        assert!(matcher.register("a.jpg", 0.0, 0.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_logs_tree_ids() {
        let matcher = MockMatchClient::new().with_matches(vec![Match::new("kp-9", 0.5)]);
        let trees = vec![TreeId::new("t1"), TreeId::new("t2")];
        let matches = matcher.query("q.jpg", &trees).await.unwrap();
        assert_eq!(matches, vec![Match::new("kp-9", 0.5)]);
        assert_eq!(matcher.queried_tree_ids(), vec![trees]);
    }

    #[tokio::test]
    async fn test_full_failure_rate_always_fails() {
        let matcher = MockMatchClient::new().with_failure_rate(1.0);
        assert!(matcher.query("q.jpg", &[TreeId::new("t")]).await.is_err());
    }
}
