//! Amazon S3 object store
//!
//! Blocking adapter over the async SDK client. Buckets are expected to have
//! versioning enabled; every write returns the version id S3 assigned.

use std::fmt::Display;
use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use tracing::debug;

use super::{FileLocation, ObjectStore, StorageError, TagStore, Tags};
use crate::aws::AwsContext;

/// S3 object store
pub struct S3ObjectStore {
    context: Arc<AwsContext>,
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(context: Arc<AwsContext>) -> Self {
        let mut s3_config = aws_sdk_s3::config::Builder::from(context.sdk_config());

        // S3-compatible storage such as MinIO
        if let Some(endpoint) = context.endpoint_url() {
            s3_config = s3_config.endpoint_url(endpoint);
            s3_config = s3_config.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config.build());
        Self { context, client }
    }

    fn copy_source(location: &FileLocation) -> String {
        let mut source = format!(
            "{}/{}",
            location.bucket,
            urlencoding::encode(&location.key)
        );
        if let Some(version) = &location.version_id {
            source.push_str("?versionId=");
            source.push_str(&urlencoding::encode(version));
        }
        source
    }
}

fn backend_error(action: &str, target: impl Display, error: impl std::error::Error) -> StorageError {
    StorageError::BackendError(format!(
        "Failed to {} {}: {}",
        action,
        target,
        DisplayErrorContext(error)
    ))
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, location: &FileLocation) -> Result<Vec<u8>, StorageError> {
        location.ensure_complete()?;
        self.context.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .set_version_id(location.version_id.clone())
                .send()
                .await
                .map_err(|e| {
                    if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                        StorageError::ObjectNotFound(location.to_string())
                    } else {
                        backend_error("read", location, e)
                    }
                })?;

            let bytes = response
                .body
                .collect()
                .await
                .map_err(|e| StorageError::IoError(e.to_string()))?;
            Ok::<_, StorageError>(bytes.into_bytes().to_vec())
        })
    }

    fn put_object(&self, bucket: &str, key: &str, content: &[u8]) -> Result<FileLocation, StorageError> {
        let location = FileLocation::new(bucket, key);
        location.ensure_complete()?;
        let response = self
            .context
            .block_on(
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(content.to_vec()))
                    .send(),
            )
            .map_err(|e| backend_error("write", &location, e))?;

        debug!(bucket, key, bytes = content.len(), "Wrote object");
        Ok(location.with_version(response.version_id().map(str::to_string)))
    }

    fn copy_object(
        &self,
        source: &FileLocation,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<FileLocation, StorageError> {
        source.ensure_complete()?;
        let target = FileLocation::new(target_bucket, target_key);
        target.ensure_complete()?;

        let response = self
            .context
            .block_on(
                self.client
                    .copy_object()
                    .copy_source(Self::copy_source(source))
                    .bucket(target_bucket)
                    .key(target_key)
                    .send(),
            )
            .map_err(|e| backend_error("copy", format!("{} to {}", source, target), e))?;

        debug!(source = %source, target = %target, "Copied object");
        Ok(target.with_version(response.version_id().map(str::to_string)))
    }

    fn delete_object(&self, location: &FileLocation) -> Result<(), StorageError> {
        location.ensure_complete()?;
        self.context
            .block_on(
                self.client
                    .delete_object()
                    .bucket(&location.bucket)
                    .key(&location.key)
                    .send(),
            )
            .map_err(|e| backend_error("delete", location, e))?;
        Ok(())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let result = self
            .context
            .block_on(self.client.head_object().bucket(bucket).key(key).send());
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => Err(backend_error("inspect", format!("{}/{}", bucket, key), e)),
        }
    }

    fn version_id(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        let response = self
            .context
            .block_on(self.client.head_object().bucket(bucket).key(key).send())
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_not_found()) {
                    StorageError::ObjectNotFound(format!("{}/{}", bucket, key))
                } else {
                    backend_error("inspect", format!("{}/{}", bucket, key), e)
                }
            })?;
        Ok(response.version_id().map(str::to_string))
    }
}

impl TagStore for S3ObjectStore {
    fn get_tags(&self, location: &FileLocation) -> Result<Tags, StorageError> {
        location.ensure_complete()?;
        let response = self
            .context
            .block_on(
                self.client
                    .get_object_tagging()
                    .bucket(&location.bucket)
                    .key(&location.key)
                    .set_version_id(location.version_id.clone())
                    .send(),
            )
            .map_err(|e| backend_error("read tags of", location, e))?;

        Ok(response
            .tag_set()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect())
    }

    fn put_tags(&self, location: &FileLocation, tags: &Tags) -> Result<(), StorageError> {
        location.ensure_complete()?;
        let tag_set = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        self.context
            .block_on(
                self.client
                    .put_object_tagging()
                    .bucket(&location.bucket)
                    .key(&location.key)
                    .set_version_id(location.version_id.clone())
                    .tagging(tagging)
                    .send(),
            )
            .map_err(|e| backend_error("tag", location, e))?;
        Ok(())
    }
}
