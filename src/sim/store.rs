//! [`ObjectStore`] backed by a [`ResourceActor`] of simulated buckets.

use crate::clients::object_store::{
    DeleteObjectRequest, DeleteOutcome, ObjectLockConfiguration, ObjectStore, StorageError,
    VersionListing,
};
use crate::framework::{FrameworkError, ResourceActor, ResourceClient};
use crate::sim::bucket::{Bucket, BucketAction, BucketActionResult, BucketCreate};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, instrument};

const CHANNEL_CAPACITY: usize = 32;

/// In-memory S3 stand-in. Clones share the same buckets.
#[derive(Clone)]
pub struct SimulatedObjectStore {
    inner: ResourceClient<Bucket>,
}

impl SimulatedObjectStore {
    /// Start a bucket actor on the current runtime.
    pub fn spawn() -> Self {
        let (actor, client) = ResourceActor::<Bucket>::new(CHANNEL_CAPACITY);
        tokio::spawn(actor.run(()));
        Self::from_client(client)
    }

    /// Wrap an existing client, e.g. one from
    /// [`create_mock_client`](crate::framework::mock::create_mock_client).
    pub fn from_client(inner: ResourceClient<Bucket>) -> Self {
        Self { inner }
    }

    /// Latest visible body of every key under `prefix`, sorted by key.
    #[instrument(skip(self))]
    pub async fn visible_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<(String, Bytes)>, StorageError> {
        match self
            .action(
                "ListObjects",
                bucket,
                BucketAction::ListVisible {
                    prefix: prefix.to_string(),
                },
            )
            .await?
        {
            BucketActionResult::ListVisible(objects) => Ok(objects),
            other => Err(unexpected("ListObjects", other)),
        }
    }

    async fn action(
        &self,
        operation: &'static str,
        bucket: &str,
        action: BucketAction,
    ) -> Result<BucketActionResult, StorageError> {
        debug!("Sending request");
        self.inner
            .perform_action(bucket.to_string(), action)
            .await
            .map_err(|e| map_error(operation, e))
    }
}

fn map_error(operation: &'static str, error: FrameworkError) -> StorageError {
    match error {
        FrameworkError::NotFound(bucket) => StorageError::NoSuchBucket(bucket),
        FrameworkError::AlreadyExists(bucket) => StorageError::BucketAlreadyExists(bucket),
        other => match other.into_entity_error::<StorageError>() {
            Ok(storage) => storage,
            Err(other) => StorageError::Service {
                operation,
                message: other.to_string(),
            },
        },
    }
}

fn unexpected(operation: &'static str, result: BucketActionResult) -> StorageError {
    StorageError::Service {
        operation,
        message: format!("unexpected bucket response: {result:?}"),
    }
}

#[async_trait]
impl ObjectStore for SimulatedObjectStore {
    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: &str, object_lock: bool) -> Result<(), StorageError> {
        debug!("Sending request");
        self.inner
            .create(bucket.to_string(), BucketCreate { object_lock })
            .await
            .map_err(|e| map_error("CreateBucket", e))
    }

    #[instrument(skip(self))]
    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError> {
        match self
            .action("PutBucketVersioning", bucket, BucketAction::PutVersioning(enabled))
            .await?
        {
            BucketActionResult::PutVersioning => Ok(()),
            other => Err(unexpected("PutBucketVersioning", other)),
        }
    }

    #[instrument(skip(self))]
    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<ObjectLockConfiguration, StorageError> {
        match self
            .action(
                "GetObjectLockConfiguration",
                bucket,
                BucketAction::GetObjectLockConfiguration,
            )
            .await?
        {
            BucketActionResult::GetObjectLockConfiguration(configuration) => Ok(configuration),
            other => Err(unexpected("GetObjectLockConfiguration", other)),
        }
    }

    #[instrument(skip(self))]
    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        configuration: ObjectLockConfiguration,
    ) -> Result<(), StorageError> {
        match self
            .action(
                "PutObjectLockConfiguration",
                bucket,
                BucketAction::PutObjectLockConfiguration(configuration),
            )
            .await?
        {
            BucketActionResult::PutObjectLockConfiguration => Ok(()),
            other => Err(unexpected("PutObjectLockConfiguration", other)),
        }
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<Option<String>, StorageError> {
        let action = BucketAction::PutObject {
            key: key.to_string(),
            body,
        };
        match self.action("PutObject", bucket, action).await? {
            BucketActionResult::PutObject(version_id) => Ok(version_id),
            other => Err(unexpected("PutObject", other)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<DeleteOutcome, StorageError> {
        let action = BucketAction::DeleteObject {
            key: request.key,
            version_id: request.version_id,
            bypass_governance_retention: request.bypass_governance_retention,
        };
        match self.action("DeleteObject", &request.bucket, action).await? {
            BucketActionResult::DeleteObject(outcome) => Ok(outcome),
            other => Err(unexpected("DeleteObject", other)),
        }
    }

    #[instrument(skip(self))]
    async fn list_object_versions(&self, bucket: &str) -> Result<VersionListing, StorageError> {
        match self
            .action("ListObjectVersions", bucket, BucketAction::ListVersions)
            .await?
        {
            BucketActionResult::ListVersions(listing) => Ok(listing),
            other => Err(unexpected("ListObjectVersions", other)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        debug!("Sending request");
        self.inner
            .delete(bucket.to_string())
            .await
            .map_err(|e| map_error("DeleteBucket", e))
    }
}
