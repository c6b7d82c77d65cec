//! # landmark-db
//!
//! PostgreSQL + PostGIS storage layer for landmark.
//!
//! This crate provides:
//! - Connection pool management
//! - The image repository, including geographic radius lookup
//! - The annotation repository, including batched keypoint lookup
//! - Upload file storage shared with the feature matcher
//!
//! ## Example
//!
//! ```rust,ignore
//! use landmark_db::{Database, ImageRepository, CreateImageRequest, GeoPoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/landmark").await?;
//!
//!     let image = db.images.insert(CreateImageRequest {
//!         filename: "1760000000000-123456789.jpg".to_string(),
//!         location: GeoPoint::from_lat_lon(48.8584, 2.2945),
//!     }).await?;
//!
//!     println!("Created image: {}", image.id);
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod file_storage;
pub mod images;
pub mod pool;

// Re-export core types
pub use landmark_core::*;

pub use annotations::PgAnnotationRepository;
pub use file_storage::{
    generate_upload_filename, FilesystemBackend, StorageBackend, StoredUpload, UploadStore,
};
pub use images::PgImageRepository;
pub use pool::{connect_pool, pool_stats, PoolConfig, PoolStats};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Reference images and their geolocation.
    pub images: PgImageRepository,
    /// Tapped annotations on reference images.
    pub annotations: PgAnnotationRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            images: PgImageRepository::new(pool.clone()),
            annotations: PgAnnotationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = connect_pool(url, &PoolConfig::default()).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = connect_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
