//! Annotation repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use landmark_core::{
    Annotation, AnnotationRepository, CreateAnnotationRequest, Error, KeypointId,
    PixelCoordinates, Result,
};

fn annotation_from_row(row: &PgRow) -> Result<Annotation> {
    let keypoint_id: Option<String> = row.try_get("keypoint_id")?;
    Ok(Annotation {
        id: row.try_get("id")?,
        image_id: row.try_get("image_id")?,
        keypoint_id: keypoint_id.map(KeypointId::new),
        description: row.try_get("description")?,
        coordinates: PixelCoordinates::new(row.try_get("x")?, row.try_get("y")?),
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL implementation of AnnotationRepository.
#[derive(Clone)]
pub struct PgAnnotationRepository {
    pool: Pool<Postgres>,
}

impl PgAnnotationRepository {
    /// Create a new PgAnnotationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnotationRepository for PgAnnotationRepository {
    async fn insert(&self, req: CreateAnnotationRequest) -> Result<Annotation> {
        req.coordinates.validate()?;

        let annotation = Annotation {
            id: Uuid::now_v7(),
            image_id: req.image_id,
            keypoint_id: req.keypoint_id,
            description: req.description,
            coordinates: req.coordinates,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO annotation (id, image_id, keypoint_id, description, x, y, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(annotation.id)
        .bind(annotation.image_id)
        .bind(annotation.keypoint_id.as_ref().map(KeypointId::as_str))
        .bind(&annotation.description)
        .bind(annotation.coordinates.x)
        .bind(annotation.coordinates.y)
        .bind(annotation.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(annotation)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Annotation>> {
        let row = sqlx::query(
            "SELECT id, image_id, keypoint_id, description, x, y, created_at
             FROM annotation WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(annotation_from_row).transpose()
    }

    async fn find_by_keypoint_ids(&self, ids: &[KeypointId]) -> Result<Vec<Annotation>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let keys: Vec<String> = ids.iter().map(|k| k.as_str().to_string()).collect();
        let rows = sqlx::query(
            "SELECT id, image_id, keypoint_id, description, x, y, created_at
             FROM annotation WHERE keypoint_id = ANY($1)",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(annotation_from_row).collect()
    }

    async fn list_for_image(&self, image_id: Uuid) -> Result<Vec<Annotation>> {
        let rows = sqlx::query(
            "SELECT id, image_id, keypoint_id, description, x, y, created_at
             FROM annotation WHERE image_id = $1 ORDER BY created_at, id",
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(annotation_from_row).collect()
    }
}
