//! In-memory store for tests.
//!
//! [`InMemoryStore`] implements both repository traits over plain vectors and
//! records every write, so tests can assert how often the pipeline touched
//! an image's tree identifier.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use landmark_core::{
    Annotation, AnnotationRepository, Candidate, CreateAnnotationRequest, CreateImageRequest,
    Error, GeoPoint, Image, ImageRepository, KeypointId, PixelCoordinates, Result, TreeId,
};

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance between two points in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// A write performed against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    InsertImage(Uuid),
    InsertAnnotation(Uuid),
    SetTreeId { image_id: Uuid, tree_id: TreeId },
}

#[derive(Default)]
struct State {
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    writes: Vec<StoreWrite>,
    fail_image_inserts: bool,
    fail_annotation_insert_at: Option<usize>,
    annotation_insert_calls: usize,
}

/// Shared in-memory image and annotation store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every image insert fail as if the store were unreachable.
    pub fn fail_image_inserts(self) -> Self {
        self.state().fail_image_inserts = true;
        self
    }

    /// Fail the `n`th annotation insert (1-based).
    pub fn fail_annotation_insert_at(self, n: usize) -> Self {
        self.state().fail_annotation_insert_at = Some(n);
        self
    }

    /// Add an image directly, bypassing the write log.
    pub fn seed_image(&self, filename: &str, location: GeoPoint, tree_id: Option<&str>) -> Image {
        let image = Image {
            id: Uuid::now_v7(),
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            location,
            tree_id: tree_id.map(TreeId::new),
        };
        self.state().images.push(image.clone());
        image
    }

    /// Add an annotation directly, bypassing the write log.
    pub fn seed_annotation(
        &self,
        image_id: Uuid,
        keypoint_id: Option<&str>,
        description: &str,
    ) -> Annotation {
        let annotation = Annotation {
            id: Uuid::now_v7(),
            image_id,
            keypoint_id: keypoint_id.map(KeypointId::new),
            description: description.to_string(),
            coordinates: PixelCoordinates::new(0.0, 0.0),
            created_at: Utc::now(),
        };
        self.state().annotations.push(annotation.clone());
        annotation
    }

    /// Drop an image record, leaving its annotations in place.
    pub fn remove_image(&self, id: Uuid) {
        self.state().images.retain(|i| i.id != id);
    }

    pub fn images(&self) -> Vec<Image> {
        self.state().images.clone()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.state().annotations.clone()
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.state().writes.clone()
    }

    /// Tree id writes, in order.
    pub fn tree_id_writes(&self) -> Vec<(Uuid, TreeId)> {
        self.state()
            .writes
            .iter()
            .filter_map(|w| match w {
                StoreWrite::SetTreeId { image_id, tree_id } => Some((*image_id, tree_id.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ImageRepository for InMemoryStore {
    async fn insert(&self, req: CreateImageRequest) -> Result<Image> {
        req.location.validate()?;
        let mut state = self.state();
        if state.fail_image_inserts {
            return Err(store_unavailable());
        }
        let image = Image {
            id: Uuid::now_v7(),
            filename: req.filename,
            uploaded_at: Utc::now(),
            location: req.location,
            tree_id: None,
        };
        state.writes.push(StoreWrite::InsertImage(image.id));
        state.images.push(image.clone());
        Ok(image)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Image>> {
        Ok(self.state().images.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Image>> {
        Ok(self
            .state()
            .images
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn find_by_geo_radius(
        &self,
        point: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = self
            .state()
            .images
            .iter()
            .map(|image| Candidate {
                distance_meters: haversine_meters(point, image.location),
                image: image.clone(),
            })
            .filter(|c| c.distance_meters <= radius_meters)
            .collect();
        candidates.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.image.id.cmp(&b.image.id))
        });
        Ok(candidates)
    }

    async fn set_tree_id(&self, id: Uuid, tree_id: &TreeId) -> Result<()> {
        let mut state = self.state();
        let image = state
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(Error::ImageNotFound(id))?;
        image.tree_id = Some(tree_id.clone());
        state.writes.push(StoreWrite::SetTreeId {
            image_id: id,
            tree_id: tree_id.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl AnnotationRepository for InMemoryStore {
    async fn insert(&self, req: CreateAnnotationRequest) -> Result<Annotation> {
        req.coordinates.validate()?;
        let mut state = self.state();
        state.annotation_insert_calls += 1;
        if state.fail_annotation_insert_at == Some(state.annotation_insert_calls) {
            return Err(store_unavailable());
        }
        if !state.images.iter().any(|i| i.id == req.image_id) {
            return Err(Error::ImageNotFound(req.image_id));
        }
        let annotation = Annotation {
            id: Uuid::now_v7(),
            image_id: req.image_id,
            keypoint_id: req.keypoint_id,
            description: req.description,
            coordinates: req.coordinates,
            created_at: Utc::now(),
        };
        state.writes.push(StoreWrite::InsertAnnotation(annotation.id));
        state.annotations.push(annotation.clone());
        Ok(annotation)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Annotation>> {
        Ok(self.state().annotations.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_keypoint_ids(&self, ids: &[KeypointId]) -> Result<Vec<Annotation>> {
        Ok(self
            .state()
            .annotations
            .iter()
            .filter(|a| a.keypoint_id.as_ref().is_some_and(|k| ids.contains(k)))
            .cloned()
            .collect())
    }

    async fn list_for_image(&self, image_id: Uuid) -> Result<Vec<Annotation>> {
        Ok(self
            .state()
            .annotations
            .iter()
            .filter(|a| a.image_id == image_id)
            .cloned()
            .collect())
    }
}

fn store_unavailable() -> Error {
    Error::Request("in-memory store unavailable".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 100.0, "{}", d);
    }

    #[tokio::test]
    async fn test_geo_radius_orders_nearest_first() {
        let store = InMemoryStore::new();
        let origin = GeoPoint::new(2.2945, 48.8584);
        let far = store.seed_image("far.jpg", GeoPoint::new(2.2945, 48.8624), None);
        let near = store.seed_image("near.jpg", GeoPoint::new(2.2945, 48.8594), None);
        store.seed_image("out.jpg", GeoPoint::new(2.2945, 48.9584), None);

        let found = store.find_by_geo_radius(origin, 1000.0).await.unwrap();
        let ids: Vec<Uuid> = found.iter().map(|c| c.image.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
    }

    #[tokio::test]
    async fn test_set_tree_id_is_logged() {
        let store = InMemoryStore::new();
        let image = store.seed_image("a.jpg", GeoPoint::new(0.0, 0.0), None);
        store.set_tree_id(image.id, &TreeId::new("t")).await.unwrap();
        assert_eq!(store.tree_id_writes(), vec![(image.id, TreeId::new("t"))]);
        assert_eq!(
            ImageRepository::fetch(&store, image.id).await.unwrap().unwrap().tree_id,
            Some(TreeId::new("t"))
        );
    }
}
