//! Photo search.
//!
//! The query photo is written to the shared upload directory only for the
//! duration of the matcher call and removed once the search returns, so
//! searches do not accumulate files next to the reference images.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use landmark_core::SearchHit;

use super::{image_url, CoordinatesDto};
use crate::error::ApiError;
use crate::form::ImageForm;
use crate::state::AppState;

/// One matched annotation, in matcher rank order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultDto {
    pub id: Uuid,
    pub image_id: Uuid,
    pub keypoint_id: Option<String>,
    pub description: String,
    pub coordinates: CoordinatesDto,
    pub score: f64,
    /// `None` when the owning image record is gone.
    pub image_url: Option<String>,
}

impl From<SearchHit> for SearchResultDto {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.annotation.id,
            image_id: hit.annotation.image_id,
            keypoint_id: hit.annotation.keypoint_id.map(|k| k.into_inner()),
            description: hit.annotation.description,
            coordinates: hit.annotation.coordinates.into(),
            score: hit.score,
            image_url: hit.image.as_ref().map(image_url),
        }
    }
}

/// Find stored annotations visible in a photo taken near `lat`/`lon`.
///
/// # Multipart Fields
/// - `image`: query photo (required)
/// - `lat`, `lon`: where it was taken (required)
///
/// # Returns
/// - 200 OK with a possibly empty list, best match first
/// - 400 Bad Request on missing or malformed fields
/// - 502 Bad Gateway if the matcher or store fails
pub async fn search_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Vec<SearchResultDto>>, ApiError> {
    let form = ImageForm::read(multipart).await?;
    let image = form.image()?;
    let point = form.point()?;

    // The matcher reads the query photo from the shared upload directory.
    let stored = state.uploads.store_image(&image.filename, &image.data).await?;
    let result = state.reconciler.search(&stored.filename, point).await;

    if let Err(e) = state.uploads.remove(&stored.filename).await {
        warn!(filename = %stored.filename, error = %e, "Failed to remove query photo");
    }

    let hits = result?;
    Ok(Json(hits.into_iter().map(SearchResultDto::from).collect()))
}
