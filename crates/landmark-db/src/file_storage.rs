//! Upload storage for reference and query images.
//!
//! Uploads are written flat into a directory shared with the feature matcher,
//! which opens them by filename. Every stored file gets a server-generated
//! name (`{unix_millis}-{9 random digits}{.ext}`) so client names never touch
//! the filesystem and concurrent uploads never collide.
//!
//! ## Example
//!
//! ```rust,ignore
//! use landmark_db::file_storage::{FilesystemBackend, UploadStore};
//!
//! let store = UploadStore::new(FilesystemBackend::new("/app/uploads"), 25 * 1024 * 1024);
//! let stored = store.store_image("IMG_0042.JPG", &bytes).await?;
//! println!("matcher reference: {}", stored.filename);
//! ```

use async_trait::async_trait;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use landmark_core::{is_safe_stored_name, upload_extension, validate_image_upload, Error, Result};

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given name.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read data stored under the given name.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Check if data exists under the given name.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Remove data stored under the given name. Removing a missing name is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Filesystem storage backend rooted at a single directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn full_path(&self, name: &str) -> Result<PathBuf> {
        if !is_safe_stored_name(name) {
            return Err(Error::InvalidInput(format!(
                "Invalid stored file name: {:?}",
                name
            )));
        }
        Ok(self.base_path.join(name))
    }

    /// Create the base directory and verify it can write, read, and delete files.
    ///
    /// Run at startup so permission problems surface before the first upload.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let test_file = self.base_path.join(".health-check.tmp");
        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(name)?;
        debug!(filename = %name, full_path = %full_path.display(), size = data.len(), "file_storage: write");

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(base = %self.base_path.display(), error = %e, "file_storage: create_dir_all failed");
            e
        })?;

        // Atomic write: temp file + rename, so the matcher never reads a partial image
        let temp_path = full_path.with_extension("partial");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            e
        })?;

        // rw-r--r--, no execute
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(name)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Upload {} not found", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let full_path = self.full_path(name)?;
        Ok(fs::try_exists(full_path).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full_path = self.full_path(name)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Generate a unique stored filename keeping only the extension hint.
///
/// Format: `{unix_millis}-{0..1e9 random}{.ext}`, e.g. `1760000000000-48213377.jpg`.
pub fn generate_upload_filename(original_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "{}-{}{}",
        chrono::Utc::now().timestamp_millis(),
        suffix,
        upload_extension(original_name)
    )
}

/// A validated upload written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    /// Server-generated name; the matcher reference for this image.
    pub filename: String,
    /// MIME type detected from magic bytes.
    pub content_type: String,
    pub size_bytes: usize,
}

/// Validates image uploads and writes them through a [`StorageBackend`].
#[derive(Clone)]
pub struct UploadStore {
    backend: Arc<dyn StorageBackend>,
    max_size_bytes: u64,
}

impl UploadStore {
    pub fn new(backend: impl StorageBackend + 'static, max_size_bytes: u64) -> Self {
        Self {
            backend: Arc::new(backend),
            max_size_bytes,
        }
    }

    /// Validate `data` as an image and store it under a fresh unique name.
    pub async fn store_image(&self, original_name: &str, data: &[u8]) -> Result<StoredUpload> {
        let content_type = validate_image_upload(original_name, data, self.max_size_bytes)?;
        let filename = generate_upload_filename(original_name);

        self.backend.write(&filename, data).await?;

        debug!(
            filename = %filename,
            content_type = %content_type,
            size = data.len(),
            "Upload stored"
        );
        Ok(StoredUpload {
            filename,
            content_type,
            size_bytes: data.len(),
        })
    }

    /// Read a stored upload and its detected content type.
    pub async fn read(&self, filename: &str) -> Result<(Vec<u8>, String)> {
        let data = self.backend.read(filename).await?;
        let content_type = infer_content_type(&data);
        Ok((data, content_type))
    }

    pub async fn exists(&self, filename: &str) -> Result<bool> {
        self.backend.exists(filename).await
    }

    /// Remove a stored upload, e.g. a query photo once the matcher is done with it.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        self.backend.delete(filename).await?;
        debug!(filename = %filename, "Upload removed");
        Ok(())
    }
}

fn infer_content_type(data: &[u8]) -> String {
    // Stored files were validated as images on the way in.
    match validate_image_upload("stored", data, u64::MAX) {
        Ok(mime) => mime,
        Err(_) => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn test_generate_upload_filename_format() {
        let name = generate_upload_filename("IMG_1.JPG");
        assert!(name.ends_with(".jpg"), "{}", name);
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        let digits = rest.trim_end_matches(".jpg");
        assert!(digits.parse::<u32>().unwrap() < 1_000_000_000);
        assert!(is_safe_stored_name(&name));
    }

    #[test]
    fn test_generate_upload_filename_drops_unknown_extension() {
        let name = generate_upload_filename("evil.sh");
        assert!(!name.contains(".sh"));
    }

    #[test]
    fn test_generate_upload_filename_unique() {
        let a = generate_upload_filename("a.png");
        let b = generate_upload_filename("a.png");
        let c = generate_upload_filename("a.png");
        assert!(a != b || b != c);
    }

    #[tokio::test]
    async fn test_filesystem_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.write("1-2.png", &PNG).await.unwrap();
        assert!(backend.exists("1-2.png").await.unwrap());
        assert_eq!(backend.read("1-2.png").await.unwrap(), PNG.to_vec());
        assert!(!dir.path().join("1-2.partial").exists());
    }

    #[tokio::test]
    async fn test_filesystem_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        let err = backend.read("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_filesystem_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        let err = backend.read("missing.png").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validate_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");
        let backend = FilesystemBackend::new(&nested);

        backend.validate().await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_upload_store_stores_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(FilesystemBackend::new(dir.path()), 1024);

        let stored = store.store_image("photo.png", &PNG).await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.size_bytes, PNG.len());
        assert!(dir.path().join(&stored.filename).exists());

        let (data, content_type) = store.read(&stored.filename).await.unwrap();
        assert_eq!(data, PNG.to_vec());
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_upload_store_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(FilesystemBackend::new(dir.path()), 1024);

        let stored = store.store_image("query.png", &PNG).await.unwrap();
        store.remove(&stored.filename).await.unwrap();
        assert!(!store.exists(&stored.filename).await.unwrap());

        // Second removal is a no-op.
        store.remove(&stored.filename).await.unwrap();
        assert!(matches!(
            store.remove("../escape.png").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_upload_store_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(FilesystemBackend::new(dir.path()), 1024);

        let err = store.store_image("notes.png", b"plain text").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
