//! In-memory object store
//!
//! Versioned like an S3 bucket with versioning enabled: every write creates a
//! new version id. Failures can be injected per operation to exercise the
//! pipeline's compensation paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{FileLocation, ObjectStore, StorageError, TagStore, Tags};

/// Operation a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    Put,
    Copy,
    Delete,
    GetTags,
    PutTags,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    version_id: String,
    tags: Tags,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeSet<String>,
    objects: HashMap<(String, String), StoredObject>,
    failures: Vec<(StoreOperation, String)>,
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
    next_version: AtomicU64,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the store with the given buckets
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for bucket in buckets {
            store.create_bucket(bucket);
        }
        store
    }

    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.lock().buckets.insert(bucket.into());
    }

    /// Make `operation` fail for every key containing `key_fragment`
    pub fn fail_on(&self, operation: StoreOperation, key_fragment: impl Into<String>) {
        self.lock().failures.push((operation, key_fragment.into()));
    }

    /// Keys stored in a bucket, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_version_id(&self) -> String {
        format!("v{}", self.next_version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_failure(state: &State, operation: StoreOperation, key: &str) -> Result<(), StorageError> {
        if state
            .failures
            .iter()
            .any(|(op, fragment)| *op == operation && key.contains(fragment.as_str()))
        {
            return Err(StorageError::BackendError(format!(
                "injected {:?} failure for {}",
                operation, key
            )));
        }
        Ok(())
    }

    fn check_bucket(state: &State, bucket: &str) -> Result<(), StorageError> {
        if state.buckets.contains(bucket) {
            Ok(())
        } else {
            Err(StorageError::BucketNotFound(bucket.to_string()))
        }
    }

    fn find<'a>(state: &'a State, location: &FileLocation) -> Result<&'a StoredObject, StorageError> {
        let object = state
            .objects
            .get(&(location.bucket.clone(), location.key.clone()))
            .ok_or_else(|| StorageError::ObjectNotFound(location.to_string()))?;
        if let Some(version) = &location.version_id
            && version != &object.version_id
        {
            return Err(StorageError::ObjectNotFound(format!(
                "{} (version {})",
                location, version
            )));
        }
        Ok(object)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get_object(&self, location: &FileLocation) -> Result<Vec<u8>, StorageError> {
        location.ensure_complete()?;
        let state = self.lock();
        Self::check_failure(&state, StoreOperation::Get, &location.key)?;
        Ok(Self::find(&state, location)?.content.clone())
    }

    fn put_object(&self, bucket: &str, key: &str, content: &[u8]) -> Result<FileLocation, StorageError> {
        FileLocation::new(bucket, key).ensure_complete()?;
        let version_id = self.next_version_id();
        let mut state = self.lock();
        Self::check_failure(&state, StoreOperation::Put, key)?;
        Self::check_bucket(&state, bucket)?;
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content: content.to_vec(),
                version_id: version_id.clone(),
                tags: Tags::new(),
            },
        );
        Ok(FileLocation::new(bucket, key).with_version(Some(version_id)))
    }

    fn copy_object(
        &self,
        source: &FileLocation,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<FileLocation, StorageError> {
        source.ensure_complete()?;
        FileLocation::new(target_bucket, target_key).ensure_complete()?;
        let version_id = self.next_version_id();
        let mut state = self.lock();
        Self::check_failure(&state, StoreOperation::Copy, target_key)?;
        Self::check_bucket(&state, target_bucket)?;
        let mut copy = Self::find(&state, source)?.clone();
        copy.version_id = version_id.clone();
        state
            .objects
            .insert((target_bucket.to_string(), target_key.to_string()), copy);
        Ok(FileLocation::new(target_bucket, target_key).with_version(Some(version_id)))
    }

    fn delete_object(&self, location: &FileLocation) -> Result<(), StorageError> {
        location.ensure_complete()?;
        let mut state = self.lock();
        Self::check_failure(&state, StoreOperation::Delete, &location.key)?;
        Self::find(&state, location)?;
        state
            .objects
            .remove(&(location.bucket.clone(), location.key.clone()));
        Ok(())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn version_id(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        let state = self.lock();
        let object = Self::find(&state, &FileLocation::new(bucket, key))?;
        Ok(Some(object.version_id.clone()))
    }
}

impl TagStore for MemoryObjectStore {
    fn get_tags(&self, location: &FileLocation) -> Result<Tags, StorageError> {
        location.ensure_complete()?;
        let state = self.lock();
        Self::check_failure(&state, StoreOperation::GetTags, &location.key)?;
        Ok(Self::find(&state, location)?.tags.clone())
    }

    fn put_tags(&self, location: &FileLocation, tags: &Tags) -> Result<(), StorageError> {
        location.ensure_complete()?;
        let mut state = self.lock();
        Self::check_failure(&state, StoreOperation::PutTags, &location.key)?;
        Self::find(&state, location)?;
        if let Some(object) = state
            .objects
            .get_mut(&(location.bucket.clone(), location.key.clone()))
        {
            object.tags = tags.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryObjectStore {
        MemoryObjectStore::with_buckets(["raw", "curated"])
    }

    #[test]
    fn test_put_and_get() {
        let store = store();
        let location = store.put_object("raw", "a/b.csv", b"x,y\n1,2\n").unwrap();
        assert!(location.version_id.is_some());
        assert_eq!(store.get_object(&location).unwrap(), b"x,y\n1,2\n");
    }

    #[test]
    fn test_put_requires_bucket() {
        let store = store();
        let err = store.put_object("missing", "a", b"").unwrap_err();
        assert!(matches!(err, StorageError::BucketNotFound(_)));
    }

    #[test]
    fn test_copy_creates_new_version_and_keeps_tags() {
        let store = store();
        let source = store.put_object("raw", "a.csv", b"data").unwrap();
        let mut tags = Tags::new();
        tags.insert("hash".to_string(), "abc".to_string());
        store.put_tags(&source, &tags).unwrap();

        let copy = store.copy_object(&source, "curated", "b.csv").unwrap();
        assert_ne!(copy.version_id, source.version_id);
        assert_eq!(store.get_tags(&copy).unwrap(), tags);
        assert!(store.object_exists("raw", "a.csv").unwrap());
    }

    #[test]
    fn test_move_removes_source() {
        let store = store();
        let source = store.put_object("raw", "a.csv", b"data").unwrap();
        let moved = store.move_object(&source, "raw", "done/a.csv").unwrap();
        assert!(!store.object_exists("raw", "a.csv").unwrap());
        assert_eq!(store.get_object(&moved).unwrap(), b"data");
    }

    #[test]
    fn test_stale_version_is_not_found() {
        let store = store();
        let first = store.put_object("raw", "a.csv", b"one").unwrap();
        store.put_object("raw", "a.csv", b"two").unwrap();
        assert!(matches!(
            store.get_object(&first),
            Err(StorageError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_injected_failure() {
        let store = store();
        let source = store.put_object("raw", "a.csv", b"data").unwrap();
        store.fail_on(StoreOperation::Copy, "Processed");
        assert!(store.copy_object(&source, "raw", "x/Processed/a.csv").is_err());
        assert!(store.copy_object(&source, "raw", "x/Other/a.csv").is_ok());
    }

    #[test]
    fn test_missing_key_is_missing_value() {
        let store = store();
        assert!(matches!(
            store.put_object("raw", "", b""),
            Err(StorageError::MissingValue(_))
        ));
    }
}
