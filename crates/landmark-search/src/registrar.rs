//! Keypoint registration for one image and a list of taps.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use landmark_core::{
    defaults, Annotation, AnnotationRepository, BulkOutcome, BulkSummary, CreateAnnotationRequest,
    CreateImageRequest, Error, GeoPoint, Image, ImageRepository, MatchClient, RegisteredAnnotation,
    Result, Tap, TreeId,
};

use crate::timeouts::{bounded, CallTimeouts};

/// Persists an image and registers user taps on it with the matcher.
///
/// Registration is not atomic. Annotations persisted before a failure stay
/// persisted and nothing is retried; the returned [`BulkSummary`] tells the
/// caller how far the run got.
#[derive(Clone)]
pub struct BulkRegistrar {
    images: Arc<dyn ImageRepository>,
    annotations: Arc<dyn AnnotationRepository>,
    matcher: Arc<dyn MatchClient>,
    timeouts: CallTimeouts,
    max_taps: usize,
}

impl BulkRegistrar {
    pub fn new(
        images: Arc<dyn ImageRepository>,
        annotations: Arc<dyn AnnotationRepository>,
        matcher: Arc<dyn MatchClient>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            images,
            annotations,
            matcher,
            timeouts,
            max_taps: defaults::MAX_BULK_TAPS,
        }
    }

    pub fn with_max_taps(mut self, max_taps: usize) -> Self {
        self.max_taps = max_taps;
        self
    }

    /// Register every tap on the stored image `filename`, strictly in order.
    ///
    /// Returns `Err` only when the input is invalid or the image record could
    /// not be created. A registration failure after that ends the run with
    /// [`BulkOutcome::Aborted`]; the last tree id seen before it is still
    /// written so the committed prefix remains searchable.
    #[instrument(
        skip(self, taps),
        fields(subsystem = "search", component = "registrar", op = "register_bulk", tap_count = taps.len())
    )]
    pub async fn register_bulk(
        &self,
        filename: &str,
        point: GeoPoint,
        taps: &[Tap],
    ) -> Result<BulkSummary> {
        self.validate(filename, point, taps)?;
        let start = Instant::now();

        let image = self.persist_image(filename, point).await?;

        let mut last_tree_id: Option<TreeId> = None;
        let mut persisted: Vec<Annotation> = Vec::with_capacity(taps.len());
        let mut taps_processed = 0;
        let mut failure: Option<(usize, Error)> = None;

        for (index, tap) in taps.iter().enumerate() {
            taps_processed += 1;
            match self.register_tap(&image, tap).await {
                Ok((annotation, tree_id)) => {
                    if tree_id.is_some() {
                        last_tree_id = tree_id;
                    }
                    persisted.push(annotation);
                }
                Err((tree_id, e)) => {
                    if tree_id.is_some() {
                        last_tree_id = tree_id;
                    }
                    failure = Some((index, e));
                    break;
                }
            }
        }

        let mut tree_write_error = None;
        if let Some(tree_id) = &last_tree_id {
            if let Err(e) = self.write_tree_id(image.id, tree_id).await {
                tree_write_error = Some(e);
            }
        }

        let outcome = match (failure, tree_write_error) {
            (Some((failed_tap, e)), tree_err) => {
                if let Some(tree_err) = tree_err {
                    warn!(
                        image_id = %image.id,
                        error = %tree_err,
                        "Tree id write failed after aborted bulk registration"
                    );
                }
                warn!(
                    image_id = %image.id,
                    failed_tap,
                    annotations_persisted = persisted.len(),
                    error = %e,
                    "Bulk registration aborted"
                );
                BulkOutcome::Aborted {
                    failed_tap,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
            (None, Some(e)) => {
                warn!(image_id = %image.id, error = %e, "Tree id write failed");
                BulkOutcome::Aborted {
                    failed_tap: taps.len(),
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
            (None, None) => BulkOutcome::Committed,
        };

        let summary = BulkSummary {
            image_id: image.id,
            taps_total: taps.len(),
            taps_processed,
            annotations_persisted: persisted.len(),
            tree_id: last_tree_id,
            outcome,
        };

        info!(
            image_id = %summary.image_id,
            taps_processed = summary.taps_processed,
            annotations_persisted = summary.annotations_persisted,
            success = summary.is_committed(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Bulk registration finished"
        );
        Ok(summary)
    }

    /// Persist the image, register one tap and persist its annotation.
    ///
    /// A failed registration is returned as the error; the image record stays.
    #[instrument(skip(self, tap), fields(subsystem = "search", component = "registrar", op = "register_single"))]
    pub async fn register_single(
        &self,
        filename: &str,
        point: GeoPoint,
        tap: &Tap,
    ) -> Result<RegisteredAnnotation> {
        self.validate(filename, point, std::slice::from_ref(tap))?;

        let mut image = self.persist_image(filename, point).await?;

        let registration = bounded(
            "matcher.register",
            self.timeouts.matcher,
            self.matcher.register(&image.filename, tap.x, tap.y),
        )
        .await?;

        if let Some(tree_id) = &registration.tree_id {
            self.write_tree_id(image.id, tree_id).await?;
            image.tree_id = Some(tree_id.clone());
        }

        let annotation = self
            .persist_annotation(&image, tap, registration.keypoint_id.clone())
            .await?;

        info!(
            image_id = %image.id,
            annotation_id = %annotation.id,
            keypoint_id = %registration.keypoint_id,
            "Single keypoint registered"
        );
        Ok(RegisteredAnnotation {
            image,
            annotation,
            keypoint_id: registration.keypoint_id,
        })
    }

    fn validate(&self, filename: &str, point: GeoPoint, taps: &[Tap]) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(Error::InvalidInput("Image is required".to_string()));
        }
        point.validate()?;
        if taps.is_empty() {
            return Err(Error::InvalidInput(
                "At least one annotation is required".to_string(),
            ));
        }
        if taps.len() > self.max_taps {
            return Err(Error::InvalidInput(format!(
                "Too many annotations: {} (max {})",
                taps.len(),
                self.max_taps
            )));
        }
        for (i, tap) in taps.iter().enumerate() {
            tap.coordinates()
                .validate()
                .map_err(|e| Error::InvalidInput(format!("Annotation {}: {}", i, e)))?;
            if tap.description.chars().count() > defaults::MAX_DESCRIPTION_CHARS {
                return Err(Error::InvalidInput(format!(
                    "Annotation {}: description exceeds {} characters",
                    i,
                    defaults::MAX_DESCRIPTION_CHARS
                )));
            }
        }
        Ok(())
    }

    async fn persist_image(&self, filename: &str, point: GeoPoint) -> Result<Image> {
        let image = bounded(
            "store.insert_image",
            self.timeouts.store,
            self.images.insert(CreateImageRequest {
                filename: filename.to_string(),
                location: point,
            }),
        )
        .await?;
        debug!(image_id = %image.id, "Image persisted");
        Ok(image)
    }

    async fn persist_annotation(
        &self,
        image: &Image,
        tap: &Tap,
        keypoint_id: landmark_core::KeypointId,
    ) -> Result<Annotation> {
        bounded(
            "store.insert_annotation",
            self.timeouts.store,
            self.annotations.insert(CreateAnnotationRequest {
                image_id: image.id,
                keypoint_id: Some(keypoint_id),
                description: tap.description.clone(),
                coordinates: tap.coordinates(),
            }),
        )
        .await
    }

    /// Register one tap and persist its annotation.
    ///
    /// On failure the tree id from a successful registration is handed back
    /// alongside the error.
    async fn register_tap(
        &self,
        image: &Image,
        tap: &Tap,
    ) -> std::result::Result<(Annotation, Option<TreeId>), (Option<TreeId>, Error)> {
        let registration = bounded(
            "matcher.register",
            self.timeouts.matcher,
            self.matcher.register(&image.filename, tap.x, tap.y),
        )
        .await
        .map_err(|e| (None, e))?;

        debug!(
            keypoint_id = %registration.keypoint_id,
            has_tree = registration.tree_id.is_some(),
            "Tap registered"
        );

        let annotation = self
            .persist_annotation(image, tap, registration.keypoint_id)
            .await
            .map_err(|e| (registration.tree_id.clone(), e))?;
        Ok((annotation, registration.tree_id))
    }

    async fn write_tree_id(&self, image_id: Uuid, tree_id: &TreeId) -> Result<()> {
        bounded(
            "store.set_tree_id",
            self.timeouts.store,
            self.images.set_tree_id(image_id, tree_id),
        )
        .await?;
        debug!(image_id = %image_id, tree_id = %tree_id, "Image tree id written");
        Ok(())
    }
}
