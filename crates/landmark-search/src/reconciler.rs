//! Search reconciliation: geo candidates, matcher delegation, local join.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use landmark_core::{
    Annotation, AnnotationRepository, Candidate, Error, GeoPoint, ImageRepository, KeypointId,
    Match, MatchClient, Result, SearchHit, TreeId,
};

use crate::candidates::GeoCandidateFinder;
use crate::timeouts::{bounded, CallTimeouts};

/// What to do with a match whose keypoint has no stored annotation.
///
/// The matcher and the store are written independently, so a ranked match
/// can name a keypoint the store has never persisted or has lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum JoinPolicy {
    /// Drop the match and keep going. The rest of the ranking is still returned.
    #[default]
    SkipUnresolved,
}

/// Answers "which stored annotations does this photo show?".
#[derive(Clone)]
pub struct SearchReconciler {
    candidates: GeoCandidateFinder,
    images: Arc<dyn ImageRepository>,
    annotations: Arc<dyn AnnotationRepository>,
    matcher: Arc<dyn MatchClient>,
    timeouts: CallTimeouts,
    join_policy: JoinPolicy,
}

impl SearchReconciler {
    pub fn new(
        images: Arc<dyn ImageRepository>,
        annotations: Arc<dyn AnnotationRepository>,
        matcher: Arc<dyn MatchClient>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            candidates: GeoCandidateFinder::new(images.clone(), timeouts.store),
            images,
            annotations,
            matcher,
            timeouts,
            join_policy: JoinPolicy::default(),
        }
    }

    /// Override the candidate radius (meters).
    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.candidates = self.candidates.with_radius(radius_meters);
        self
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join_policy
    }

    /// Candidate radius in meters.
    pub fn radius_meters(&self) -> f64 {
        self.candidates.radius_meters()
    }

    /// Match the stored query image `filename` taken at `point`.
    ///
    /// Returns hits in the matcher's rank order. An empty result is a normal
    /// outcome; only store or matcher failures are errors.
    #[instrument(skip(self), fields(subsystem = "search", component = "reconciler", op = "search"))]
    pub async fn search(&self, filename: &str, point: GeoPoint) -> Result<Vec<SearchHit>> {
        if filename.trim().is_empty() {
            return Err(Error::InvalidInput("Query image is required".to_string()));
        }
        point.validate()?;
        let start = Instant::now();

        let candidates = self.candidates.find_nearby(point).await?;
        if candidates.is_empty() {
            debug!(radius_m = self.radius_meters(), "No reference images in range; matcher not called");
            return Ok(vec![]);
        }

        let tree_ids = distinct_tree_ids(&candidates);
        if tree_ids.is_empty() {
            debug!(
                candidate_count = candidates.len(),
                "No candidate has a tree id; matcher not called"
            );
            return Ok(vec![]);
        }

        let matches = bounded(
            "matcher.query",
            self.timeouts.matcher,
            self.matcher.query(filename, &tree_ids),
        )
        .await?;
        if matches.is_empty() {
            debug!(tree_count = tree_ids.len(), "Matcher returned no matches");
            return Ok(vec![]);
        }

        let hits = self.join(&matches).await?;

        info!(
            candidate_count = candidates.len(),
            tree_count = tree_ids.len(),
            match_count = matches.len(),
            result_count = hits.len(),
            skipped = matches.len() - hits.len(),
            join_policy = ?self.join_policy(),
            radius_m = self.radius_meters(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(hits)
    }

    /// Join ranked matches to stored annotations and their images.
    async fn join(&self, matches: &[Match]) -> Result<Vec<SearchHit>> {
        let keypoint_ids: Vec<KeypointId> = matches.iter().map(|m| m.keypoint_id.clone()).collect();
        let annotations = bounded(
            "store.find_by_keypoint_ids",
            self.timeouts.store,
            self.annotations.find_by_keypoint_ids(&keypoint_ids),
        )
        .await?;

        let by_keypoint: HashMap<KeypointId, Annotation> = annotations
            .into_iter()
            .filter_map(|a| a.keypoint_id.clone().map(|k| (k, a)))
            .collect();

        let mut image_ids: Vec<Uuid> = Vec::new();
        for m in matches {
            if let Some(a) = by_keypoint.get(&m.keypoint_id) {
                if !image_ids.contains(&a.image_id) {
                    image_ids.push(a.image_id);
                }
            }
        }
        let images = if image_ids.is_empty() {
            vec![]
        } else {
            bounded(
                "store.find_by_ids",
                self.timeouts.store,
                self.images.find_by_ids(&image_ids),
            )
            .await?
        };
        let images_by_id: HashMap<Uuid, _> = images.into_iter().map(|i| (i.id, i)).collect();

        let mut hits = Vec::with_capacity(matches.len());
        for m in matches {
            let Some(annotation) = by_keypoint.get(&m.keypoint_id) else {
                match self.join_policy {
                    JoinPolicy::SkipUnresolved => {
                        debug!(keypoint_id = %m.keypoint_id, "No annotation for matched keypoint; skipped");
                        continue;
                    }
                }
            };
            let image = images_by_id.get(&annotation.image_id).cloned();
            if image.is_none() {
                debug!(
                    annotation_id = %annotation.id,
                    image_id = %annotation.image_id,
                    "Owning image missing; returning annotation without image"
                );
            }
            hits.push(SearchHit {
                annotation: annotation.clone(),
                image,
                score: m.score,
            });
        }
        Ok(hits)
    }
}

/// Non-empty tree ids of `candidates`, de-duplicated, nearest candidate first.
pub fn distinct_tree_ids(candidates: &[Candidate]) -> Vec<TreeId> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(|c| c.image.tree_id.as_ref())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert((*t).clone()))
        .cloned()
        .collect()
}
