//! Core data models for landmark.
//!
//! These types are shared across all landmark crates and represent
//! the core domain entities: reference images, their keypoint annotations,
//! and the transient values produced while answering a search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// A WGS84 point. Field order follows GeoJSON: longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Build a point from `lat`/`lon` request values, rejecting malformed input.
    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self::new(longitude, latitude);
        point.validate()?;
        Ok(point)
    }

    /// Check that both coordinates are finite and within WGS84 bounds.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(Error::InvalidInput(
                "Latitude and longitude must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "Latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "Longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Pixel position on an image where the user tapped a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCoordinates {
    pub x: f64,
    pub y: f64,
}

impl PixelCoordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(Error::InvalidInput(
                "Tap coordinates must be finite numbers".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// MATCHER IDENTIFIERS
// =============================================================================

/// Identifier as it may appear on the matcher wire: a string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Int(n) => n.to_string(),
            WireId::UInt(n) => n.to_string(),
            WireId::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            WireId::Float(f) => f.to_string(),
        }
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                WireId::deserialize(deserializer).map(|id| Self(id.into_string()))
            }
        }
    };
}

opaque_id!(
    /// Identifier the matcher assigns to one registered feature point.
    /// Globally unique across all images.
    KeypointId
);

opaque_id!(
    /// Identifier of the feature-index partition an image's keypoints live in.
    TreeId
);

// =============================================================================
// STORED RECORDS
// =============================================================================

/// A geotagged reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    /// Name of the stored upload; also the reference the matcher reads.
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub location: GeoPoint,
    /// Absent until at least one keypoint was registered against the image.
    pub tree_id: Option<TreeId>,
}

/// A user-described keypoint on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub image_id: Uuid,
    /// `None` means the matcher has not accepted the point; not matchable.
    pub keypoint_id: Option<KeypointId>,
    pub description: String,
    pub coordinates: PixelCoordinates,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn is_matchable(&self) -> bool {
        self.keypoint_id.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// Request for inserting an image record.
#[derive(Debug, Clone)]
pub struct CreateImageRequest {
    pub filename: String,
    pub location: GeoPoint,
}

/// Request for inserting an annotation record.
#[derive(Debug, Clone)]
pub struct CreateAnnotationRequest {
    pub image_id: Uuid,
    pub keypoint_id: Option<KeypointId>,
    pub description: String,
    pub coordinates: PixelCoordinates,
}

// =============================================================================
// TRANSIENT SEARCH VALUES
// =============================================================================

/// An image inside the search radius of a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub image: Image,
    pub distance_meters: f64,
}

/// One ranked result from the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub keypoint_id: KeypointId,
    pub score: f64,
}

impl Match {
    pub fn new(keypoint_id: impl Into<KeypointId>, score: f64) -> Self {
        Self {
            keypoint_id: keypoint_id.into(),
            score,
        }
    }
}

/// Matcher answer to a registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub keypoint_id: KeypointId,
    /// May be absent when the matcher defers tree assignment.
    pub tree_id: Option<TreeId>,
}

/// One reconciled search result, in matcher rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub annotation: Annotation,
    /// `None` when the owning image record could not be resolved.
    pub image: Option<Image>,
    pub score: f64,
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// A single user tap to register against an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub description: String,
}

impl Tap {
    pub fn new(x: f64, y: f64, description: impl Into<String>) -> Self {
        Self {
            x,
            y,
            description: description.into(),
        }
    }

    pub fn coordinates(&self) -> PixelCoordinates {
        PixelCoordinates::new(self.x, self.y)
    }
}

/// Result of registering one tap through `register_single`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredAnnotation {
    pub image: Image,
    pub annotation: Annotation,
    pub keypoint_id: KeypointId,
}

/// How a bulk registration ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkOutcome {
    /// Every tap was registered and persisted.
    Committed,
    /// Registration stopped at `failed_tap` (zero-based); earlier taps stay persisted.
    Aborted {
        failed_tap: usize,
        kind: ErrorKind,
        message: String,
    },
}

/// Bookkeeping for a bulk registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkSummary {
    pub image_id: Uuid,
    pub taps_total: usize,
    /// Taps for which a registration call was attempted.
    pub taps_processed: usize,
    pub annotations_persisted: usize,
    /// Tree identifier written onto the image, if any.
    pub tree_id: Option<TreeId>,
    pub outcome: BulkOutcome,
}

impl BulkSummary {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, BulkOutcome::Committed)
    }
}
