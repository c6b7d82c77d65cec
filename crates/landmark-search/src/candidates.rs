//! Geographic candidate lookup.

use std::sync::Arc;

use tracing::{debug, trace};

use landmark_core::{defaults, Candidate, GeoPoint, ImageRepository, Result};

use crate::timeouts::bounded;

/// Finds reference images within a fixed radius of a point.
///
/// The radius is an operator setting, never a request parameter, so the
/// candidate set stays bounded.
#[derive(Clone)]
pub struct GeoCandidateFinder {
    images: Arc<dyn ImageRepository>,
    radius_meters: f64,
    store_timeout: std::time::Duration,
}

impl GeoCandidateFinder {
    pub fn new(images: Arc<dyn ImageRepository>, store_timeout: std::time::Duration) -> Self {
        Self {
            images,
            radius_meters: defaults::SEARCH_RADIUS_METERS,
            store_timeout,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Candidates within the radius, nearest first. Empty when none are in range.
    pub async fn find_nearby(&self, point: GeoPoint) -> Result<Vec<Candidate>> {
        point.validate()?;

        let candidates = bounded(
            "store.find_by_geo_radius",
            self.store_timeout,
            self.images.find_by_geo_radius(point, self.radius_meters),
        )
        .await?;

        debug!(
            candidate_count = candidates.len(),
            radius_m = self.radius_meters,
            "Geo candidates found"
        );
        for c in &candidates {
            trace!(image_id = %c.image.id, distance_m = c.distance_meters, "candidate");
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;
    use std::time::Duration;

    // ~111 m per 0.001 degree of latitude
    fn at(lat_offset: f64) -> GeoPoint {
        GeoPoint::new(2.2945, 48.8584 + lat_offset)
    }

    #[tokio::test]
    async fn test_nearest_first_and_radius_bound() {
        let store = InMemoryStore::new();
        let far = store.seed_image("far.jpg", at(0.005), None);
        let near = store.seed_image("near.jpg", at(0.001), None);
        store.seed_image("outside.jpg", at(0.05), None);

        let finder = GeoCandidateFinder::new(Arc::new(store), Duration::from_secs(1));
        let found = finder.find_nearby(at(0.0)).await.unwrap();

        let ids: Vec<_> = found.iter().map(|c| c.image.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
        assert!(found[0].distance_meters < found[1].distance_meters);
    }

    #[tokio::test]
    async fn test_custom_radius() {
        let store = InMemoryStore::new();
        store.seed_image("near.jpg", at(0.001), None);
        store.seed_image("far.jpg", at(0.005), None);

        let finder =
            GeoCandidateFinder::new(Arc::new(store), Duration::from_secs(1)).with_radius(200.0);
        assert_eq!(finder.radius_meters(), 200.0);
        assert_eq!(finder.find_nearby(at(0.0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_point_rejected() {
        let finder = GeoCandidateFinder::new(Arc::new(InMemoryStore::new()), Duration::from_secs(1));

        let err = finder
            .find_nearby(GeoPoint::new(f64::NAN, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, landmark_core::Error::InvalidInput(_)));
    }
}
