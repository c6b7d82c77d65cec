//! HTTP feature matcher client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use landmark_core::{Error, Match, MatchClient, Registration, Result, TreeId};

use crate::config::MatcherConfig;
use crate::wire::{decode, ProcessRequest, ProcessResponse, SearchRequest, SearchResponse};

/// JSON-over-HTTP client for the feature matcher.
///
/// Requests are never retried. Every request carries the configured timeout.
#[derive(Clone)]
pub struct HttpMatchClient {
    client: Client,
    config: MatcherConfig,
}

impl HttpMatchClient {
    /// Create a client for the given configuration.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "matcher",
            component = "http_matcher",
            url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Initializing matcher client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(MatcherConfig::from_env())
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Turn a transport error into a matcher failure, keeping timeouts distinct.
    fn send_error(&self, operation: &'static str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                operation,
                after_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Matcher(format!("{} request failed: {}", operation, e))
        }
    }

    async fn read_body(&self, operation: &'static str, response: Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.send_error(operation, e))?;

        if !status.is_success() {
            return Err(Error::Matcher(format!(
                "{} returned {}: {}",
                operation,
                status,
                truncate(&body, 200)
            )));
        }
        Ok(body)
    }

    fn log_slow(&self, operation: &'static str, elapsed: Duration) {
        if elapsed > self.config.slow_threshold {
            warn!(
                subsystem = "matcher",
                op = operation,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "Slow matcher call"
            );
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl MatchClient for HttpMatchClient {
    #[instrument(skip(self), fields(subsystem = "matcher", component = "http_matcher", op = "register"))]
    async fn register(&self, filename: &str, x: f64, y: f64) -> Result<Registration> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.config.endpoint("/process"))
            .timeout(self.config.timeout)
            .json(&ProcessRequest { filename, x, y })
            .send()
            .await
            .map_err(|e| self.send_error("matcher.register", e))?;

        let body = self.read_body("matcher.register", response).await?;
        let registration = decode::<ProcessResponse>(&body, "register")?.into_registration()?;

        let elapsed = start.elapsed();
        debug!(
            keypoint_id = %registration.keypoint_id,
            tree_id = ?registration.tree_id.as_ref().map(TreeId::as_str),
            duration_ms = elapsed.as_millis() as u64,
            "Keypoint registered"
        );
        self.log_slow("register", elapsed);
        Ok(registration)
    }

    #[instrument(skip(self, tree_ids), fields(subsystem = "matcher", component = "http_matcher", op = "query", tree_count = tree_ids.len()))]
    async fn query(&self, filename: &str, tree_ids: &[TreeId]) -> Result<Vec<Match>> {
        if tree_ids.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();
        let request = SearchRequest {
            filename,
            tree_ids: tree_ids.iter().map(TreeId::as_str).collect(),
        };

        let response = self
            .client
            .post(self.config.endpoint("/search"))
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error("matcher.query", e))?;

        let body = self.read_body("matcher.query", response).await?;
        let matches = decode::<SearchResponse>(&body, "search")?.into_matches();

        let elapsed = start.elapsed();
        debug!(
            match_count = matches.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Matcher query complete"
        );
        self.log_slow("query", elapsed);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.config.endpoint("/health"))
            .timeout(self.config.health_timeout)
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    debug!("Matcher health check passed");
                    Ok(true)
                } else {
                    warn!("Matcher health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Matcher health check error: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_query_with_no_trees_makes_no_request() {
        // Unroutable address: any request would fail.
        let client = HttpMatchClient::new(MatcherConfig::new("http://127.0.0.1:1")).unwrap();
        let matches = client.query("q.jpg", &[]).await.unwrap();
        assert!(matches.is_empty());
    }
}
