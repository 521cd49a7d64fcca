//! File system object store
//!
//! Maps buckets to directories under a base path: `{base}/{bucket}/{key}`.
//! Tags live beside the data in `{base}/.tags/{bucket}/{key}.json`. Objects
//! are unversioned.
//!
//! ## Security
//!
//! All path operations are validated to prevent path traversal attacks.
//! Paths containing ".." are rejected, and all resolved paths are verified
//! to remain within the base directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{FileLocation, ObjectStore, StorageError, TagStore, Tags};

const TAGS_DIR: &str = ".tags";

/// File system object store
pub struct FileSystemObjectStore {
    base_path: PathBuf,
}

impl FileSystemObjectStore {
    /// Create a new file system store
    ///
    /// # Example
    ///
    /// ```rust
    /// use file_ingest_pipeline::storage::FileSystemObjectStore;
    ///
    /// let store = FileSystemObjectStore::new("/var/lib/ingest");
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        if bucket.is_empty() || bucket.contains('/') || bucket == TAGS_DIR {
            return Err(StorageError::PermissionDenied(format!(
                "Invalid bucket name '{}'",
                bucket
            )));
        }
        self.resolve_path(&format!("{}/{}", bucket, key))
    }

    fn tags_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        self.resolve_path(&format!("{}/{}/{}.json", TAGS_DIR, bucket, key))
    }

    /// Resolve a path relative to the base path with security checks.
    ///
    /// - Rejects paths containing ".." components
    /// - Verifies the resolved path stays within base_path
    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = path.trim_start_matches('/');

        if normalized.contains("..") {
            return Err(StorageError::PermissionDenied(
                "Path traversal (..) not allowed".to_string(),
            ));
        }

        let full = self.base_path.join(normalized);

        for component in full.components() {
            if matches!(component, Component::ParentDir) {
                return Err(StorageError::PermissionDenied(
                    "Path traversal not allowed".to_string(),
                ));
            }
        }

        if full.exists() {
            let canonical = full
                .canonicalize()
                .map_err(|e| StorageError::IoError(format!("Failed to resolve path: {}", e)))?;
            let base_canonical = self
                .base_path
                .canonicalize()
                .unwrap_or_else(|_| self.base_path.clone());

            if !canonical.starts_with(&base_canonical) {
                return Err(StorageError::PermissionDenied(
                    "Path escapes base directory".to_string(),
                ));
            }
            return Ok(canonical);
        }

        Ok(full)
    }

    fn bucket_exists(&self, bucket: &str) -> bool {
        self.base_path.join(bucket).is_dir()
    }

    fn write(&self, path: &Path, content: &[u8], display: &str) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::IoError(format!("Failed to create directory for {}: {}", display, e))
            })?;
        }
        fs::write(path, content)
            .map_err(|e| StorageError::IoError(format!("Failed to write {}: {}", display, e)))
    }

    fn read_tags(&self, bucket: &str, key: &str) -> Result<Tags, StorageError> {
        let path = self.tags_path(bucket, key)?;
        match fs::read(&path) {
            Ok(content) => serde_json::from_slice(&content)
                .map_err(|e| StorageError::SerializationError(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tags::new()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to read tags for {}/{}: {}",
                bucket, key, e
            ))),
        }
    }

    fn write_tags(&self, bucket: &str, key: &str, tags: &Tags) -> Result<(), StorageError> {
        let path = self.tags_path(bucket, key)?;
        let content = serde_json::to_vec_pretty(tags)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.write(&path, &content, &format!("tags of {}/{}", bucket, key))
    }

    fn not_found(location: &FileLocation, e: std::io::Error, action: &str) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::ObjectNotFound(location.to_string())
        } else {
            StorageError::IoError(format!("Failed to {} {}: {}", action, location, e))
        }
    }
}

impl ObjectStore for FileSystemObjectStore {
    fn get_object(&self, location: &FileLocation) -> Result<Vec<u8>, StorageError> {
        location.ensure_complete()?;
        let path = self.object_path(&location.bucket, &location.key)?;
        fs::read(&path).map_err(|e| Self::not_found(location, e, "read"))
    }

    fn open_object(&self, location: &FileLocation) -> Result<Box<dyn Read + Send>, StorageError> {
        location.ensure_complete()?;
        let path = self.object_path(&location.bucket, &location.key)?;
        let file = File::open(&path).map_err(|e| Self::not_found(location, e, "open"))?;
        Ok(Box::new(file))
    }

    fn put_object(&self, bucket: &str, key: &str, content: &[u8]) -> Result<FileLocation, StorageError> {
        let location = FileLocation::new(bucket, key);
        location.ensure_complete()?;
        if !self.bucket_exists(bucket) {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        let path = self.object_path(bucket, key)?;
        self.write(&path, content, &location.to_string())?;
        debug!(bucket, key, bytes = content.len(), "Wrote object");
        Ok(location)
    }

    fn copy_object(
        &self,
        source: &FileLocation,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<FileLocation, StorageError> {
        let content = self.get_object(source)?;
        let tags = self.read_tags(&source.bucket, &source.key)?;
        let target = self.put_object(target_bucket, target_key, &content)?;
        if !tags.is_empty() {
            self.write_tags(target_bucket, target_key, &tags)?;
        }
        Ok(target)
    }

    fn delete_object(&self, location: &FileLocation) -> Result<(), StorageError> {
        location.ensure_complete()?;
        let path = self.object_path(&location.bucket, &location.key)?;
        fs::remove_file(&path).map_err(|e| Self::not_found(location, e, "delete"))?;

        let tags = self.tags_path(&location.bucket, &location.key)?;
        match fs::remove_file(&tags) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to delete tags of {}: {}",
                location, e
            ))),
        }
    }

    fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(bucket, key)?;
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to check existence of {}/{}: {}",
                bucket, key, e
            ))),
        }
    }

    fn version_id(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        if !self.object_exists(bucket, key)? {
            return Err(StorageError::ObjectNotFound(format!("{}/{}", bucket, key)));
        }
        Ok(None)
    }
}

impl TagStore for FileSystemObjectStore {
    fn get_tags(&self, location: &FileLocation) -> Result<Tags, StorageError> {
        location.ensure_complete()?;
        if !self.object_exists(&location.bucket, &location.key)? {
            return Err(StorageError::ObjectNotFound(location.to_string()));
        }
        self.read_tags(&location.bucket, &location.key)
    }

    fn put_tags(&self, location: &FileLocation, tags: &Tags) -> Result<(), StorageError> {
        location.ensure_complete()?;
        if !self.object_exists(&location.bucket, &location.key)? {
            return Err(StorageError::ObjectNotFound(location.to_string()));
        }
        self.write_tags(&location.bucket, &location.key, tags)
    }
}
