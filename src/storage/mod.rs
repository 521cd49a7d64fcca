//! Object store abstraction
//!
//! Defines the [`ObjectStore`] trait and its implementations:
//! - [`MemoryObjectStore`]: versioned in-process store (tests, dry runs)
//! - [`FileSystemObjectStore`]: local directory per bucket
//! - `S3ObjectStore`: Amazon S3 (requires the `aws` feature)
//!
//! Stores are synchronous. A copy returns the [`FileLocation`] of the new
//! object so callers can thread the location of an in-flight file explicitly.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};

pub mod filesystem;
pub mod memory;
#[cfg(feature = "aws")]
pub mod s3;

pub use filesystem::FileSystemObjectStore;
pub use memory::MemoryObjectStore;
#[cfg(feature = "aws")]
pub use s3::S3ObjectStore;

/// Object tags, keyed by tag name
pub type Tags = BTreeMap<String, String>;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),
    #[error("Missing required value: {0}")]
    MissingValue(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Address of one stored object version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLocation {
    pub bucket: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl FileLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version_id: None,
        }
    }

    /// Set the object version; empty strings mean "latest"
    pub fn with_version(mut self, version_id: Option<String>) -> Self {
        self.version_id = version_id.filter(|v| !v.is_empty());
        self
    }

    /// `s3://{bucket}/{key}`
    pub fn uri(&self) -> String {
        crate::paths::object_uri(&self.bucket, &self.key)
    }

    /// Fail with [`StorageError::MissingValue`] when bucket or key is empty
    pub fn ensure_complete(&self) -> Result<(), StorageError> {
        if self.bucket.trim().is_empty() {
            return Err(StorageError::MissingValue(format!(
                "bucket for key '{}'",
                self.key
            )));
        }
        if self.key.trim().is_empty() {
            return Err(StorageError::MissingValue(format!(
                "key in bucket '{}'",
                self.bucket
            )));
        }
        Ok(())
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Trait for object stores
///
/// All operations address objects by bucket and key. Copies carry the source
/// object's tags to the new object.
pub trait ObjectStore: Send + Sync {
    /// Read the whole object
    fn get_object(&self, location: &FileLocation) -> Result<Vec<u8>, StorageError>;

    /// Open the object for streaming reads
    fn open_object(&self, location: &FileLocation) -> Result<Box<dyn Read + Send>, StorageError> {
        Ok(Box::new(Cursor::new(self.get_object(location)?)))
    }

    /// Write an object, returning the location of the stored version
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
    ) -> Result<FileLocation, StorageError>;

    /// Copy an object, returning the location of the new version
    fn copy_object(
        &self,
        source: &FileLocation,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<FileLocation, StorageError>;

    /// Delete an object
    fn delete_object(&self, location: &FileLocation) -> Result<(), StorageError>;

    /// Check if an object exists
    fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Latest version id of an object, `None` for unversioned stores
    fn version_id(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Copy then delete the source
    fn move_object(
        &self,
        source: &FileLocation,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<FileLocation, StorageError> {
        let moved = self.copy_object(source, target_bucket, target_key)?;
        self.delete_object(source)?;
        Ok(moved)
    }
}

/// Trait for stores that keep key-value tags on objects
pub trait TagStore: Send + Sync {
    fn get_tags(&self, location: &FileLocation) -> Result<Tags, StorageError>;

    /// Replace the whole tag set of the object
    fn put_tags(&self, location: &FileLocation, tags: &Tags) -> Result<(), StorageError>;
}
