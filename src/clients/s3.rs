//! [`ObjectStore`] over the AWS SDK, pointed at an S3-compatible endpoint.

use crate::clients::object_store::{
    DefaultRetention, DeleteMarker, DeleteObjectRequest, DeleteOutcome, ObjectLockConfiguration,
    ObjectStore, ObjectVersion, RetentionMode, StorageError, VersionListing,
};
use crate::config::ObjectStoreConnection;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketVersioningStatus, DefaultRetention as SdkDefaultRetention,
    ObjectLockConfiguration as SdkObjectLockConfiguration, ObjectLockEnabled,
    ObjectLockRetentionMode, ObjectLockRule, VersioningConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info, instrument};

/// Region sent with every request; S3-compatible stores ignore it but the
/// signer needs one.
const SIGNING_REGION: &str = "us-east-1";

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client with static credentials and path-style addressing.
    pub async fn connect(connection: &ObjectStoreConnection) -> Self {
        let credentials = Credentials::new(
            connection.access_key.clone(),
            connection.secret_key.clone(),
            None,
            None,
            "lakehouse-lock-demo",
        );
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(connection.connect_timeout)
            .read_timeout(connection.read_timeout)
            .build();

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(connection.endpoint_url())
            .region(Region::new(SIGNING_REGION))
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .load()
            .await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        // TLS follows the endpoint scheme; the SDK has no separate switch.
        info!(endpoint = %connection.endpoint_url(), tls = connection.uses_tls(), "S3 client ready");
        Self {
            client: Client::from_conf(config),
        }
    }
}

fn storage_error<E>(operation: &'static str, bucket: &str, err: SdkError<E>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err.code() {
        Some("NoSuchBucket") => StorageError::NoSuchBucket(bucket.to_string()),
        Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
            StorageError::BucketAlreadyExists(bucket.to_string())
        }
        Some("BucketNotEmpty") => StorageError::BucketNotEmpty(bucket.to_string()),
        Some("ObjectLockConfigurationNotFoundError") => {
            StorageError::NoObjectLockConfiguration(bucket.to_string())
        }
        Some("AccessDenied") => {
            StorageError::AccessDenied(err.message().unwrap_or(operation).to_string())
        }
        _ => StorageError::Service {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

fn to_sdk_mode(mode: RetentionMode) -> ObjectLockRetentionMode {
    match mode {
        RetentionMode::Governance => ObjectLockRetentionMode::Governance,
        RetentionMode::Compliance => ObjectLockRetentionMode::Compliance,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: &str, object_lock: bool) -> Result<(), StorageError> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .object_lock_enabled_for_bucket(object_lock)
            .send()
            .await
            .map_err(|e| storage_error("CreateBucket", bucket, e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| storage_error("PutBucketVersioning", bucket, e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<ObjectLockConfiguration, StorageError> {
        let output = self
            .client
            .get_object_lock_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| storage_error("GetObjectLockConfiguration", bucket, e))?;

        let Some(config) = output.object_lock_configuration() else {
            return Err(StorageError::NoObjectLockConfiguration(bucket.to_string()));
        };
        let enabled = matches!(config.object_lock_enabled(), Some(ObjectLockEnabled::Enabled));
        let default_retention = config
            .rule()
            .and_then(|rule| rule.default_retention())
            .and_then(|retention| {
                let mode = RetentionMode::parse_str(retention.mode()?.as_str())?;
                let days = u32::try_from(retention.days()?).ok()?;
                Some(DefaultRetention { mode, days })
            });
        Ok(ObjectLockConfiguration {
            enabled,
            default_retention,
        })
    }

    #[instrument(skip(self))]
    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        configuration: ObjectLockConfiguration,
    ) -> Result<(), StorageError> {
        let mut builder = SdkObjectLockConfiguration::builder();
        if configuration.enabled {
            builder = builder.object_lock_enabled(ObjectLockEnabled::Enabled);
        }
        if let Some(rule) = configuration.default_retention {
            let days = i32::try_from(rule.days).map_err(|_| {
                StorageError::InvalidRequest(format!("retention of {} days is too long", rule.days))
            })?;
            builder = builder.rule(
                ObjectLockRule::builder()
                    .default_retention(
                        SdkDefaultRetention::builder()
                            .mode(to_sdk_mode(rule.mode))
                            .days(days)
                            .build(),
                    )
                    .build(),
            );
        }
        self.client
            .put_object_lock_configuration()
            .bucket(bucket)
            .object_lock_configuration(builder.build())
            .send()
            .await
            .map_err(|e| storage_error("PutObjectLockConfiguration", bucket, e))?;
        Ok(())
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<Option<String>, StorageError> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| storage_error("PutObject", bucket, e))?;
        Ok(output.version_id().map(str::to_string))
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<DeleteOutcome, StorageError> {
        let output = self
            .client
            .delete_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id.clone())
            .bypass_governance_retention(request.bypass_governance_retention)
            .send()
            .await
            .map_err(|e| storage_error("DeleteObject", &request.bucket, e))?;
        Ok(DeleteOutcome {
            version_id: output.version_id().map(str::to_string),
            delete_marker: output.delete_marker().unwrap_or(false),
        })
    }

    #[instrument(skip(self))]
    async fn list_object_versions(&self, bucket: &str) -> Result<VersionListing, StorageError> {
        let mut listing = VersionListing::default();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| storage_error("ListObjectVersions", bucket, e))?;

            listing.versions.extend(page.versions().iter().filter_map(|v| {
                Some(ObjectVersion {
                    key: v.key()?.to_string(),
                    version_id: v.version_id()?.to_string(),
                    is_latest: v.is_latest().unwrap_or(false),
                })
            }));
            listing.delete_markers.extend(page.delete_markers().iter().filter_map(|m| {
                Some(DeleteMarker {
                    key: m.key()?.to_string(),
                    version_id: m.version_id()?.to_string(),
                    is_latest: m.is_latest().unwrap_or(false),
                })
            }));

            if !page.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_marker = page.next_version_id_marker().map(str::to_string);
            if key_marker.is_none() && version_marker.is_none() {
                break;
            }
            debug!(versions = listing.versions.len(), "Listing truncated, fetching next page");
        }

        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| storage_error("DeleteBucket", bucket, e))?;
        Ok(())
    }
}
