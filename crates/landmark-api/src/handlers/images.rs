//! Read access to stored images and their annotations.
//!
//! After an aborted bulk registration these endpoints show which prefix of
//! taps was committed.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use landmark_core::{Annotation, Error, Image};

use super::{image_url, CoordinatesDto};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub tree_id: Option<String>,
    pub image_url: String,
}

impl From<Image> for ImageDto {
    fn from(image: Image) -> Self {
        Self {
            image_url: image_url(&image),
            id: image.id,
            filename: image.filename,
            uploaded_at: image.uploaded_at,
            latitude: image.location.latitude,
            longitude: image.location.longitude,
            tree_id: image.tree_id.map(|t| t.into_inner()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDto {
    pub id: Uuid,
    pub image_id: Uuid,
    pub keypoint_id: Option<String>,
    pub description: String,
    pub coordinates: CoordinatesDto,
    pub created_at: DateTime<Utc>,
}

impl From<Annotation> for AnnotationDto {
    fn from(a: Annotation) -> Self {
        Self {
            id: a.id,
            image_id: a.image_id,
            keypoint_id: a.keypoint_id.map(|k| k.into_inner()),
            description: a.description,
            coordinates: a.coordinates.into(),
            created_at: a.created_at,
        }
    }
}

async fn fetch_image(state: &AppState, id: Uuid) -> Result<Image, ApiError> {
    state
        .images
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::from(Error::ImageNotFound(id)))
}

/// Get one image record.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImageDto>, ApiError> {
    Ok(Json(fetch_image(&state, id).await?.into()))
}

/// List the annotations persisted for an image, oldest first.
pub async fn list_image_annotations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AnnotationDto>>, ApiError> {
    let image = fetch_image(&state, id).await?;
    let annotations = state.annotations.list_for_image(image.id).await?;
    Ok(Json(annotations.into_iter().map(AnnotationDto::from).collect()))
}
