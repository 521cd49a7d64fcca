//! Object tagging with an allow-list of tag keys

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::models::TagKey;
use crate::storage::{FileLocation, StorageError, TagStore, Tags};

/// Errors raised while tagging objects
#[derive(Error, Debug)]
pub enum TaggingError {
    #[error("Tag key '{key}' is not allowed, allowed keys: {}", allowed.join(", "))]
    NotAllowed { key: String, allowed: Vec<String> },

    #[error("Failed to tag {location}: {source}")]
    Storage {
        location: String,
        #[source]
        source: StorageError,
    },
}

impl TaggingError {
    /// The underlying storage error, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Storage { source, .. } => Some(source),
            Self::NotAllowed { .. } => None,
        }
    }
}

/// Merges tags into an object's existing tag set
#[derive(Clone)]
pub struct Tagger {
    store: Arc<dyn TagStore>,
}

impl Tagger {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    /// Add `tags` to the object, overwriting existing values of the same keys
    pub fn tag<K, V, I>(&self, location: &FileLocation, tags: I) -> Result<Tags, TaggingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags: Tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for key in tags.keys() {
            Self::check_allowed(key)?;
        }

        let storage = |source| TaggingError::Storage {
            location: location.to_string(),
            source,
        };
        let mut merged = self.store.get_tags(location).map_err(storage)?;
        merged.extend(tags);
        self.store.put_tags(location, &merged).map_err(storage)?;

        debug!(location = %location, tags = ?merged, "Tagged object");
        Ok(merged)
    }

    /// Set one allow-listed tag
    pub fn tag_one(
        &self,
        location: &FileLocation,
        key: TagKey,
        value: impl Into<String>,
    ) -> Result<Tags, TaggingError> {
        let value: String = value.into();
        self.tag(location, [(key.as_str(), value)])
    }

    fn check_allowed(key: &str) -> Result<(), TaggingError> {
        if TagKey::all().iter().any(|k| k.as_str() == key) {
            Ok(())
        } else {
            Err(TaggingError::NotAllowed {
                key: key.to_string(),
                allowed: TagKey::all().iter().map(|k| k.as_str().to_string()).collect(),
            })
        }
    }
}
