//! Bulk keypoint registration.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use landmark_core::{BulkOutcome, BulkSummary, ErrorKind};

use crate::error::{ApiError, UPSTREAM_FAILURE_MESSAGE};
use crate::form::ImageForm;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub message: String,
    pub image_id: Uuid,
    pub taps_total: usize,
    pub taps_processed: usize,
    pub annotations_persisted: usize,
    pub tree_id: Option<String>,
    /// `committed` or `aborted`.
    pub status: &'static str,
    /// Zero-based index of the tap that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_tap: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkResponse {
    /// Response body and status for a summary. Aborted runs map to 502 with
    /// the same body so the client can see which prefix was committed.
    pub fn from_summary(summary: BulkSummary) -> (StatusCode, Self) {
        let (status, label, failed_tap, error, message) = match &summary.outcome {
            BulkOutcome::Committed => (
                StatusCode::OK,
                "committed",
                None,
                None,
                format!("{} annotations saved", summary.annotations_persisted),
            ),
            BulkOutcome::Aborted {
                failed_tap,
                kind,
                message,
            } => {
                let (status, error) = match kind {
                    ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, message.clone()),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, message.clone()),
                    ErrorKind::DelegatedServiceFailure => (
                        StatusCode::BAD_GATEWAY,
                        UPSTREAM_FAILURE_MESSAGE.to_string(),
                    ),
                    ErrorKind::Internal => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    ),
                };
                (
                    status,
                    "aborted",
                    Some(*failed_tap),
                    Some(error),
                    format!(
                        "Registration aborted: {} of {} annotations saved",
                        summary.annotations_persisted, summary.taps_total
                    ),
                )
            }
        };

        (
            status,
            Self {
                message,
                image_id: summary.image_id,
                taps_total: summary.taps_total,
                taps_processed: summary.taps_processed,
                annotations_persisted: summary.annotations_persisted,
                tree_id: summary.tree_id.map(|t| t.into_inner()),
                status: label,
                failed_tap,
                error,
            },
        )
    }
}

/// Store a reference image and register every tap in `annotationsData`.
///
/// # Multipart Fields
/// - `image`: image file (required)
/// - `lat`, `lon`: where the photo was taken (required)
/// - `annotationsData`: JSON array of `{x, y, description}` (required, non-empty)
///
/// # Returns
/// - 200 OK with the summary when every tap was saved
/// - 502 Bad Gateway with the summary and `error` when the run aborted partway
/// - 400 Bad Request on missing or malformed fields
pub async fn bulk_annotate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BulkResponse>), ApiError> {
    let form = ImageForm::read(multipart).await?;
    let image = form.image()?;
    let point = form.point()?;
    let taps = form.taps()?;

    let stored = state.uploads.store_image(&image.filename, &image.data).await?;
    let summary = state
        .registrar
        .register_bulk(&stored.filename, point, &taps)
        .await?;

    let (status, body) = BulkResponse::from_summary(summary);
    Ok((status, Json(body)))
}
