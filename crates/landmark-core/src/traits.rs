//! Core traits for landmark abstractions.
//!
//! These traits define the capabilities the search and registration pipeline
//! consumes. Concrete implementations live in `landmark-db` (PostGIS store)
//! and `landmark-matcher` (HTTP feature matcher); tests substitute
//! deterministic fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// IMAGE REPOSITORY
// =============================================================================

/// Repository for reference image records.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a new image record, returning it with its assigned identifier.
    async fn insert(&self, req: CreateImageRequest) -> Result<Image>;

    /// Fetch an image by identifier.
    async fn fetch(&self, id: Uuid) -> Result<Option<Image>>;

    /// Fetch every image whose identifier is in `ids`. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Image>>;

    /// Images within `radius_meters` of `point`, nearest first.
    async fn find_by_geo_radius(
        &self,
        point: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Candidate>>;

    /// Set the tree identifier of an image.
    async fn set_tree_id(&self, id: Uuid, tree_id: &TreeId) -> Result<()>;
}

// =============================================================================
// ANNOTATION REPOSITORY
// =============================================================================

/// Repository for keypoint annotations.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    /// Insert a new annotation.
    async fn insert(&self, req: CreateAnnotationRequest) -> Result<Annotation>;

    /// Fetch an annotation by identifier.
    async fn fetch(&self, id: Uuid) -> Result<Option<Annotation>>;

    /// Annotations whose keypoint identifier is in `ids`, in no particular order.
    async fn find_by_keypoint_ids(&self, ids: &[KeypointId]) -> Result<Vec<Annotation>>;

    /// All annotations of one image, oldest first.
    async fn list_for_image(&self, image_id: Uuid) -> Result<Vec<Annotation>>;
}

// =============================================================================
// FEATURE MATCHER
// =============================================================================

/// Capability interface to the external feature matcher.
///
/// Both calls cross a process boundary. Implementations report transport and
/// service errors as [`crate::Error::Matcher`] or [`crate::Error::Request`] and
/// never retry.
#[async_trait]
pub trait MatchClient: Send + Sync {
    /// Register the feature nearest to `(x, y)` on the stored image `filename`.
    async fn register(&self, filename: &str, x: f64, y: f64) -> Result<Registration>;

    /// Match the stored image `filename` against the given feature-index partitions.
    ///
    /// `tree_ids` must be non-empty and de-duplicated. The result is ordered best
    /// match first.
    async fn query(&self, filename: &str, tree_ids: &[TreeId]) -> Result<Vec<Match>>;

    /// Check whether the matcher is reachable.
    async fn health_check(&self) -> Result<bool>;
}
