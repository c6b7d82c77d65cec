//! # landmark-search
//!
//! Search reconciliation and keypoint registration for landmark.
//!
//! This crate provides:
//! - Geographic candidate lookup within a fixed radius
//! - Search reconciliation: candidate tree ids go to the feature matcher and
//!   its ranked keypoints are joined back to stored annotations in rank order
//! - Sequential bulk and single keypoint registration with partial-failure
//!   bookkeeping
//! - Time bounds on every store and matcher call
//!
//! The pipeline only sees the capability traits from `landmark-core`, so any
//! store or matcher implementation can be plugged in.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use landmark_search::{CallTimeouts, SearchReconciler, GeoPoint};
//!
//! let reconciler = SearchReconciler::new(
//!     Arc::new(db.images.clone()),
//!     Arc::new(db.annotations.clone()),
//!     Arc::new(matcher),
//!     CallTimeouts::from_env(),
//! );
//! let hits = reconciler
//!     .search("1760000000000-123456789.jpg", GeoPoint::from_lat_lon(48.8584, 2.2945)?)
//!     .await?;
//! ```

pub mod candidates;
pub mod reconciler;
pub mod registrar;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timeouts;

#[cfg(test)]
mod tests;

// Re-export core types
pub use landmark_core::*;

pub use candidates::GeoCandidateFinder;
pub use reconciler::{distinct_tree_ids, JoinPolicy, SearchReconciler};
pub use registrar::BulkRegistrar;
pub use timeouts::{bounded, CallTimeouts};
