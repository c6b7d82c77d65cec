//! Multipart form parsing shared by the image endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use landmark_core::{GeoPoint, Tap};

use crate::error::ApiError;

/// The uploaded image part.
#[derive(Debug)]
pub struct ImagePart {
    /// Client-supplied name; only its extension is kept.
    pub filename: String,
    pub data: Vec<u8>,
}

/// A parsed `multipart/form-data` body with one `image` part and text fields.
#[derive(Debug, Default)]
pub struct ImageForm {
    image: Option<ImagePart>,
    fields: HashMap<String, String>,
}

impl ImageForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = ImageForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let Some(name) = field.name().map(|n| n.to_string()) else {
                continue;
            };
            if name == "image" {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec();
                form.image = Some(ImagePart { filename, data });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// The image part; missing or empty uploads are rejected.
    pub fn image(&self) -> Result<&ImagePart, ApiError> {
        match &self.image {
            Some(part) if !part.data.is_empty() => Ok(part),
            Some(_) => Err(ApiError::BadRequest("Uploaded image is empty".to_string())),
            None => Err(ApiError::BadRequest("No image uploaded".to_string())),
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required_f64(&self, name: &str) -> Result<f64, ApiError> {
        let raw = self
            .text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Missing field '{}'", name)))?;
        raw.parse::<f64>()
            .map_err(|_| ApiError::BadRequest(format!("Field '{}' is not a number: {:?}", name, raw)))
    }

    /// The `lat`/`lon` pair as a validated point.
    pub fn point(&self) -> Result<GeoPoint, ApiError> {
        let lat = self.required_f64("lat")?;
        let lon = self.required_f64("lon")?;
        Ok(GeoPoint::from_lat_lon(lat, lon)?)
    }

    /// A single tap from `x`, `y` and an optional `description`.
    pub fn tap(&self) -> Result<Tap, ApiError> {
        let tap = Tap::new(
            self.required_f64("x")?,
            self.required_f64("y")?,
            self.text("description").unwrap_or_default().trim(),
        );
        tap.coordinates().validate()?;
        Ok(tap)
    }

    /// Taps from the `annotationsData` JSON array.
    pub fn taps(&self) -> Result<Vec<Tap>, ApiError> {
        let raw = self
            .text("annotationsData")
            .ok_or_else(|| ApiError::BadRequest("Missing field 'annotationsData'".to_string()))?;
        let taps: Vec<Tap> = serde_json::from_str(raw)
            .map_err(|e| ApiError::BadRequest(format!("Invalid annotationsData: {}", e)))?;
        if taps.is_empty() {
            return Err(ApiError::BadRequest(
                "annotationsData must contain at least one annotation".to_string(),
            ));
        }
        Ok(taps)
    }
}

#[cfg(test)]
impl ImageForm {
    pub fn from_fields(fields: &[(&str, &str)], image: Option<&[u8]>) -> Self {
        Self {
            image: image.map(|data| ImagePart {
                filename: "photo.jpg".to_string(),
                data: data.to_vec(),
            }),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
