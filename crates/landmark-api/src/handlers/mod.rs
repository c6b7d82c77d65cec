//! HTTP handlers.

pub mod bulk;
pub mod health;
pub mod images;
pub mod search;
pub mod upload;
pub mod uploads;

use serde::Serialize;

use landmark_core::{defaults, Image, PixelCoordinates};

/// Pixel position as sent to clients.
#[derive(Debug, Serialize)]
pub struct CoordinatesDto {
    pub x: f64,
    pub y: f64,
}

impl From<PixelCoordinates> for CoordinatesDto {
    fn from(c: PixelCoordinates) -> Self {
        Self { x: c.x, y: c.y }
    }
}

/// Relative URL under which a stored image is served.
pub fn image_url(image: &Image) -> String {
    format!("{}/{}", defaults::UPLOADS_ROUTE, image.filename)
}
