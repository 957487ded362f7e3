//! In-memory object storage.

use crate::config::BucketPolicy;
use crate::error::{HostError, HostResult};
use bytes::Bytes;
use hostlink_core::storage::is_valid_object_path;
use hostlink_core::{StoredObject, UploadOptions};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Content type recorded when an upload names none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Contents.
    pub data: Bytes,
    /// MIME type given at upload.
    pub content_type: String,
}

struct Bucket {
    policy: BucketPolicy,
    objects: BTreeMap<String, Object>,
}

/// The declared buckets and their objects.
pub struct Buckets {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl Buckets {
    /// Creates empty buckets for each declared name.
    pub fn new(declared: &BTreeMap<String, BucketPolicy>) -> Self {
        let buckets = declared
            .iter()
            .map(|(name, policy)| {
                (
                    name.clone(),
                    Bucket {
                        policy: *policy,
                        objects: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Returns the number of objects in `bucket`.
    pub fn object_count(&self, bucket: &str) -> Option<usize> {
        self.buckets.read().get(bucket).map(|b| b.objects.len())
    }

    /// Stores `data` at `path`.
    pub fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: &UploadOptions,
        authenticated: bool,
    ) -> HostResult<StoredObject> {
        let path = object_path(path)?;
        let mut buckets = self.buckets.write();
        let b = buckets.get_mut(bucket).ok_or(HostError::BucketNotFound)?;
        if b.policy.require_auth && !authenticated {
            return Err(HostError::StorageUnauthorized);
        }
        if !options.upsert && b.objects.contains_key(path) {
            return Err(HostError::ObjectExists);
        }

        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        b.objects
            .insert(path.to_string(), Object { data, content_type });
        Ok(StoredObject::new(bucket, path))
    }

    /// Returns the object at `path`.
    pub fn download(&self, bucket: &str, path: &str, authenticated: bool) -> HostResult<Object> {
        let path = object_path(path)?;
        let buckets = self.buckets.read();
        let b = buckets.get(bucket).ok_or(HostError::BucketNotFound)?;
        if b.policy.require_auth && !authenticated {
            return Err(HostError::StorageUnauthorized);
        }
        b.objects.get(path).cloned().ok_or(HostError::ObjectNotFound)
    }

    /// Returns the object at `path` if its bucket is public.
    ///
    /// Private buckets answer as if they did not exist.
    pub fn download_public(&self, bucket: &str, path: &str) -> HostResult<Object> {
        let path = object_path(path)?;
        let buckets = self.buckets.read();
        let b = buckets
            .get(bucket)
            .filter(|b| b.policy.public)
            .ok_or(HostError::BucketNotFound)?;
        b.objects.get(path).cloned().ok_or(HostError::ObjectNotFound)
    }
}

fn object_path(path: &str) -> HostResult<&str> {
    if is_valid_object_path(path) {
        Ok(path.trim_start_matches('/'))
    } else {
        Err(HostError::InvalidKey(path.to_string()))
    }
}
