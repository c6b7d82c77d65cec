//! Liveness and dependency health.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use landmark_db::PoolStats;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the matcher is unreachable or the pool is exhausted.
    pub status: &'static str,
    pub version: &'static str,
    pub matcher: bool,
    /// Absent when not backed by PostgreSQL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PoolStats>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.pool.as_ref().map(landmark_db::pool_stats);
    let matcher = state.matcher.health_check().await.unwrap_or(false);
    let pool_ok = !database.is_some_and(|stats| stats.exhausted());

    Json(HealthResponse {
        status: if matcher && pool_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        matcher,
        database,
    })
}
