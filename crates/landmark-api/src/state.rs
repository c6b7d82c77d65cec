//! Shared handler state.

use std::sync::Arc;

use sqlx::PgPool;

use landmark_core::{AnnotationRepository, ImageRepository, MatchClient};
use landmark_db::UploadStore;
use landmark_search::{BulkRegistrar, SearchReconciler};

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub images: Arc<dyn ImageRepository>,
    pub annotations: Arc<dyn AnnotationRepository>,
    pub matcher: Arc<dyn MatchClient>,
    pub reconciler: SearchReconciler,
    pub registrar: BulkRegistrar,
    pub uploads: UploadStore,
    /// Present when backed by PostgreSQL; used for pool metrics on `/health`.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        images: Arc<dyn ImageRepository>,
        annotations: Arc<dyn AnnotationRepository>,
        matcher: Arc<dyn MatchClient>,
        uploads: UploadStore,
        config: &ApiConfig,
    ) -> Self {
        let reconciler = SearchReconciler::new(
            images.clone(),
            annotations.clone(),
            matcher.clone(),
            config.timeouts,
        )
        .with_radius(config.search_radius_meters);
        let registrar = BulkRegistrar::new(
            images.clone(),
            annotations.clone(),
            matcher.clone(),
            config.timeouts,
        );

        Self {
            images,
            annotations,
            matcher,
            reconciler,
            registrar,
            uploads,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}
