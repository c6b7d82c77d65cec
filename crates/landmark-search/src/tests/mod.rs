//! Pipeline tests against the in-memory store and the scripted matcher.


use std::sync::Arc;
use std::time::Duration;

use landmark_core::GeoPoint;
use landmark_matcher::MockMatchClient;

use crate::testing::InMemoryStore;
use crate::{BulkRegistrar, CallTimeouts, SearchReconciler};

/// Eiffel Tower.
pub(crate) fn origin() -> GeoPoint {
    GeoPoint::new(2.2945, 48.8584)
}

/// A point roughly `meters` north of [`origin`].
pub(crate) fn north(meters: f64) -> GeoPoint {
    GeoPoint::new(2.2945, 48.8584 + meters / 111_195.0)
}

pub(crate) fn timeouts() -> CallTimeouts {
    CallTimeouts::default()
        .with_store(Duration::from_secs(1))
        .with_matcher(Duration::from_secs(1))
}

pub(crate) fn reconciler(store: &InMemoryStore, matcher: &MockMatchClient) -> SearchReconciler {
    SearchReconciler::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(matcher.clone()),
        timeouts(),
    )
}

pub(crate) fn registrar(store: &InMemoryStore, matcher: &MockMatchClient) -> BulkRegistrar {
    BulkRegistrar::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(matcher.clone()),
        timeouts(),
    )
}
