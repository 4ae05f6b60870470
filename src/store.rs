//! Storage contract and S3 implementation.
//!
//! [`ObjectStore`] is the seam between the sync pipeline and the bucket: list
//! everything under the target prefix, upload a file, delete an object. The
//! production implementation is [`S3Store`] on top of `aws-sdk-s3`; tests use
//! the generated [`MockObjectStore`].
//!
//! Keys on this interface are always *relative to the prefix*, so the diff
//! engine compares them directly against local relative paths. The
//! implementation joins the prefix back on before talking to S3.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use mockall::automock;
use tracing::{debug, info};

/// Error type for store operations (boxed, like SDK errors themselves).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// One object under the target prefix, as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Object key relative to the target prefix.
    pub key: String,
    pub size: u64,
    /// Last-modified time as epoch seconds, when the listing reports one.
    pub mtime: Option<i64>,
}

/// Parsed `s3://bucket/prefix` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: String,
    /// Prefix with no leading or trailing slash; empty for bucket-root syncs.
    pub prefix: String,
}

#[derive(Debug)]
pub struct InvalidUri(pub String);

impl fmt::Display for InvalidUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid S3 target {:?}: must be s3://bucket/prefix", self.0)
    }
}

impl std::error::Error for InvalidUri {}

impl S3Target {
    pub fn parse(uri: &str) -> Result<Self, InvalidUri> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| InvalidUri(uri.to_string()))?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((b, p)) => (b, p.trim_matches('/')),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(InvalidUri(uri.to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }

    /// Full object key for a relative path under this target.
    pub fn join_key(&self, rel: &str) -> String {
        if self.prefix.is_empty() {
            rel.to_string()
        } else {
            format!("{}/{}", self.prefix, rel)
        }
    }

    /// Listing prefix: the prefix with a trailing slash, so `docs` does not
    /// also match `docs-archive/`.
    pub fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }
}

impl fmt::Display for S3Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Trait for the bucket side of a sync run.
///
/// The trait is implemented by the real S3 client and by test mocks; all
/// methods are async and return boxed errors, which implementors produce by
/// converting upstream SDK errors.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under the target prefix, keys relative to it,
    /// sorted by key.
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, StoreError>;

    /// Upload a local file to `key`, recording its mtime as object metadata.
    async fn put_object(&self, key: &str, local: &Path, mtime: i64) -> Result<(), StoreError>;

    /// Delete the object at `key`.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}

/// Production [`ObjectStore`] backed by `aws-sdk-s3`.
///
/// Credentials come from the AWS default chain (environment, shared config,
/// instance metadata); `profile` and `region` narrow it down.
pub struct S3Store {
    client: S3Client,
    target: S3Target,
}

impl S3Store {
    pub async fn connect(target: S3Target, profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;
        info!(target = %target, "connected S3 store");
        Self {
            client: S3Client::new(&config),
            target,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, StoreError> {
        let list_prefix = self.target.list_prefix();
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.target.bucket)
            .prefix(&list_prefix)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page?;
            for obj in page.contents() {
                let Some(full_key) = obj.key() else { continue };
                let key = full_key
                    .strip_prefix(&list_prefix)
                    .unwrap_or(full_key)
                    .to_string();
                // A zero-length key is the prefix placeholder object some
                // tools create for "directories"; it has no local meaning.
                if key.is_empty() {
                    continue;
                }
                objects.push(RemoteObject {
                    key,
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    mtime: obj.last_modified().map(|t| t.secs()),
                });
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(objects = objects.len(), target = %self.target, "remote listing complete");
        Ok(objects)
    }

    async fn put_object(&self, key: &str, local: &Path, mtime: i64) -> Result<(), StoreError> {
        let body = ByteStream::from_path(local).await?;
        self.client
            .put_object()
            .bucket(&self.target.bucket)
            .key(self.target.join_key(key))
            .metadata("mtime", mtime.to_string())
            .body(body)
            .send()
            .await?;
        info!(key, local = %local.display(), "uploaded object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.target.bucket)
            .key(self.target.join_key(key))
            .send()
            .await?;
        info!(key, "deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_bucket_and_prefix() {
        let t = S3Target::parse("s3://my-bucket/backups/daily").unwrap();
        assert_eq!(t.bucket, "my-bucket");
        assert_eq!(t.prefix, "backups/daily");
    }

    #[test]
    fn parse_accepts_bare_bucket_and_trailing_slashes() {
        let t = S3Target::parse("s3://my-bucket").unwrap();
        assert_eq!(t.prefix, "");
        let t = S3Target::parse("s3://my-bucket/prefix/").unwrap();
        assert_eq!(t.prefix, "prefix");
    }

    #[test]
    fn parse_rejects_missing_scheme_or_bucket() {
        assert!(S3Target::parse("my-bucket/prefix").is_err());
        assert!(S3Target::parse("http://my-bucket/prefix").is_err());
        assert!(S3Target::parse("s3://").is_err());
        assert!(S3Target::parse("s3:///prefix").is_err());
    }

    #[test]
    fn join_key_handles_empty_prefix() {
        let with = S3Target::parse("s3://b/pre").unwrap();
        assert_eq!(with.join_key("a/b.txt"), "pre/a/b.txt");
        let without = S3Target::parse("s3://b").unwrap();
        assert_eq!(without.join_key("a/b.txt"), "a/b.txt");
    }

    #[test]
    fn list_prefix_carries_trailing_slash_only_when_nonempty() {
        assert_eq!(S3Target::parse("s3://b/pre").unwrap().list_prefix(), "pre/");
        assert_eq!(S3Target::parse("s3://b").unwrap().list_prefix(), "");
    }
}
