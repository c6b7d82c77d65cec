//! Structured logging schema and field name constants for landmark.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (skipped join, aborted bulk, slow call) |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (candidates, matches) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → sub-calls.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "matcher"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "reconciler", "registrar", "candidates", "http_matcher", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search", "register_bulk", "register", "query"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Image UUID being operated on.
pub const IMAGE_ID: &str = "image_id";

/// Annotation UUID being operated on.
pub const ANNOTATION_ID: &str = "annotation_id";

/// Matcher keypoint identifier.
pub const KEYPOINT_ID: &str = "keypoint_id";

/// Matcher tree identifier.
pub const TREE_ID: &str = "tree_id";

/// Stored upload filename.
pub const FILENAME: &str = "filename";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidate images inside the search radius.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of distinct tree identifiers sent to the matcher.
pub const TREE_COUNT: &str = "tree_count";

/// Number of matches returned by the matcher.
pub const MATCH_COUNT: &str = "match_count";

/// Number of results returned to the caller.
pub const RESULT_COUNT: &str = "result_count";

/// Number of matches dropped by the join policy.
pub const SKIPPED_COUNT: &str = "skipped";

/// Number of taps in a bulk registration.
pub const TAP_COUNT: &str = "tap_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
