//! # Object Store Interface
//!
//! The subset of the S3 API the demo drives, expressed as a trait so the
//! lifecycle can run against a real endpoint or the in-memory simulation.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from an object-store call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("bucket does not exist: {0}")]
    NoSuchBucket(String),

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("bucket is not empty: {0}")]
    BucketNotEmpty(String),

    #[error("object lock configuration not found for bucket: {0}")]
    NoObjectLockConfiguration(String),

    #[error("version {version_id} of {key} does not exist")]
    NoSuchVersion { key: String, version_id: String },

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{operation} failed: {message}")]
    Service { operation: &'static str, message: String },
}

/// Object-lock retention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetentionMode {
    /// Deletable before expiry only when the caller asserts bypass.
    Governance,
    /// Never deletable before expiry.
    Compliance,
}

impl RetentionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Governance => "GOVERNANCE",
            RetentionMode::Compliance => "COMPLIANCE",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "GOVERNANCE" => Some(RetentionMode::Governance),
            "COMPLIANCE" => Some(RetentionMode::Compliance),
            _ => None,
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention applied to every new object version in a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRetention {
    pub mode: RetentionMode,
    pub days: u32,
}

/// Bucket-level object-lock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectLockConfiguration {
    pub enabled: bool,
    pub default_retention: Option<DefaultRetention>,
}

impl ObjectLockConfiguration {
    pub fn with_default_retention(mode: RetentionMode, days: u32) -> Self {
        Self {
            enabled: true,
            default_retention: Some(DefaultRetention { mode, days }),
        }
    }
}

impl fmt::Display for ObjectLockConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.enabled { "Enabled" } else { "Disabled" };
        match self.default_retention {
            Some(rule) => write!(
                f,
                "ObjectLockEnabled={status}, DefaultRetention(Mode={}, Days={})",
                rule.mode, rule.days
            ),
            None => write!(f, "ObjectLockEnabled={status}, no default retention rule"),
        }
    }
}

/// A stored object version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// A delete marker left by an unversioned delete on a versioned bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarker {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// Everything `ListObjectVersions` reports for a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionListing {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<DeleteMarker>,
}

impl VersionListing {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.delete_markers.is_empty()
    }
}

/// Parameters of a `DeleteObject` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteObjectRequest {
    pub bucket: String,
    pub key: String,
    /// Permanently remove this version instead of adding a delete marker.
    pub version_id: Option<String>,
    /// Assert the right to remove GOVERNANCE-locked versions.
    pub bypass_governance_retention: bool,
}

impl DeleteObjectRequest {
    pub fn latest(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version_id: None,
            bypass_governance_retention: false,
        }
    }

    pub fn version(
        bucket: impl Into<String>,
        key: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version_id: Some(version_id.into()),
            bypass_governance_retention: false,
        }
    }

    pub fn bypass_governance(mut self) -> Self {
        self.bypass_governance_retention = true;
        self
    }
}

/// What `DeleteObject` reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Version created (a new delete marker) or removed.
    pub version_id: Option<String>,
    /// Whether that version is a delete marker.
    pub delete_marker: bool,
}

/// The object-store operations the demo depends on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_bucket(&self, bucket: &str, object_lock: bool) -> Result<(), StorageError>;

    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError>;

    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<ObjectLockConfiguration, StorageError>;

    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        configuration: ObjectLockConfiguration,
    ) -> Result<(), StorageError>;

    /// Returns the new version id, if the bucket is versioned.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<Option<String>, StorageError>;

    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<DeleteOutcome, StorageError>;

    /// Every version and delete marker in the bucket, across all pages.
    async fn list_object_versions(&self, bucket: &str) -> Result<VersionListing, StorageError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError>;
}
