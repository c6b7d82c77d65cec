//! Image repository implementation backed by PostGIS.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use landmark_core::{
    Candidate, CreateImageRequest, Error, GeoPoint, Image, ImageRepository, Result, TreeId,
};

/// Columns selected for every image read. Coordinates come back as plain floats.
const IMAGE_COLUMNS: &str = r#"
    id,
    filename,
    uploaded_at,
    ST_X(location::geometry) AS longitude,
    ST_Y(location::geometry) AS latitude,
    tree_id
"#;

fn image_from_row(row: &PgRow) -> Result<Image> {
    let tree_id: Option<String> = row.try_get("tree_id")?;
    Ok(Image {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        uploaded_at: row.try_get("uploaded_at")?,
        location: GeoPoint::new(row.try_get("longitude")?, row.try_get("latitude")?),
        tree_id: tree_id.map(TreeId::new).filter(|t| !t.is_empty()),
    })
}

/// PostgreSQL implementation of ImageRepository.
#[derive(Clone)]
pub struct PgImageRepository {
    pool: Pool<Postgres>,
}

impl PgImageRepository {
    /// Create a new PgImageRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    #[instrument(skip(self, req), fields(subsystem = "db", component = "images", op = "insert"))]
    async fn insert(&self, req: CreateImageRequest) -> Result<Image> {
        req.location.validate()?;

        let image = Image {
            id: Uuid::now_v7(),
            filename: req.filename,
            uploaded_at: Utc::now(),
            location: req.location,
            tree_id: None,
        };

        sqlx::query(
            r#"
            INSERT INTO image (id, filename, uploaded_at, location)
            VALUES ($1, $2, $3, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography)
            "#,
        )
        .bind(image.id)
        .bind(&image.filename)
        .bind(image.uploaded_at)
        .bind(image.location.longitude)
        .bind(image.location.latitude)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(image_id = %image.id, filename = %image.filename, "Image inserted");
        Ok(image)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Image>> {
        let row = sqlx::query(&format!("SELECT {} FROM image WHERE id = $1", IMAGE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(image_from_row).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Image>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM image WHERE id = ANY($1)",
            IMAGE_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(image_from_row).collect()
    }

    /// Uses the GIST index on `location` through `ST_DWithin`; ties on distance
    /// fall back to id order.
    #[instrument(skip(self), fields(subsystem = "db", component = "images", op = "find_by_geo_radius"))]
    async fn find_by_geo_radius(
        &self,
        point: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {},
                   ST_Distance(
                       location,
                       ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography
                   ) AS distance_m
            FROM image
            WHERE ST_DWithin(
                location,
                ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography,
                $3
            )
            ORDER BY distance_m, id
            "#,
            IMAGE_COLUMNS
        ))
        .bind(point.longitude)
        .bind(point.latitude)
        .bind(radius_meters)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| -> Result<Candidate> {
                Ok(Candidate {
                    image: image_from_row(row)?,
                    distance_meters: row.try_get("distance_m")?,
                })
            })
            .collect()
    }

    async fn set_tree_id(&self, id: Uuid, tree_id: &TreeId) -> Result<()> {
        let result = sqlx::query("UPDATE image SET tree_id = $2 WHERE id = $1")
            .bind(id)
            .bind(tree_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ImageNotFound(id));
        }
        debug!(image_id = %id, tree_id = %tree_id, "Image tree id updated");
        Ok(())
    }
}
