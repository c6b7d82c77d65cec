//! Single-keypoint registration.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::form::ImageForm;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub image_id: Uuid,
    pub annotation_id: Uuid,
    pub keypoint_id: String,
}

/// Store a reference image and register one tapped feature on it.
///
/// # Multipart Fields
/// - `image`: image file (required)
/// - `lat`, `lon`: where the photo was taken (required)
/// - `x`, `y`: pixel position of the tap (required)
/// - `description`: what the tapped feature is (optional)
///
/// # Returns
/// - 201 Created with the new image, annotation and keypoint identifiers
/// - 400 Bad Request on missing or malformed fields
/// - 502 Bad Gateway if the matcher or store fails; the image record stays
pub async fn upload_annotation(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let form = ImageForm::read(multipart).await?;
    let image = form.image()?;
    let point = form.point()?;
    let tap = form.tap()?;

    let stored = state.uploads.store_image(&image.filename, &image.data).await?;
    let registered = state
        .registrar
        .register_single(&stored.filename, point, &tap)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded and annotation saved".to_string(),
            image_id: registered.image.id,
            annotation_id: registered.annotation.id,
            keypoint_id: registered.keypoint_id.into_inner(),
        }),
    ))
}
