//! A simulated S3 bucket with versioning and object lock.
//!
//! Every version and delete marker of every key lives in one ordered list;
//! the newest entry for a key is its latest version.

use crate::clients::object_store::{
    DeleteMarker, DeleteOutcome, ObjectLockConfiguration, ObjectVersion, RetentionMode,
    StorageError, VersionListing,
};
use crate::framework::ActorEntity;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::{Duration, SystemTime};
use tracing::debug;
use uuid::Uuid;

/// Version id S3 reports for objects written while versioning is off.
pub const NULL_VERSION_ID: &str = "null";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningState {
    Unversioned,
    Enabled,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub mode: RetentionMode,
    pub retain_until: SystemTime,
}

impl Retention {
    fn is_active(&self, now: SystemTime) -> bool {
        self.retain_until > now
    }
}

#[derive(Debug, Clone)]
enum EntryKind {
    Object {
        body: Bytes,
        retention: Option<Retention>,
    },
    DeleteMarker,
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    version_id: String,
    kind: EntryKind,
}

#[derive(Debug, Default)]
pub struct BucketCreate {
    pub object_lock: bool,
}

#[derive(Debug)]
pub enum BucketAction {
    PutVersioning(bool),
    GetObjectLockConfiguration,
    PutObjectLockConfiguration(ObjectLockConfiguration),
    PutObject {
        key: String,
        body: Bytes,
    },
    DeleteObject {
        key: String,
        version_id: Option<String>,
        bypass_governance_retention: bool,
    },
    ListVersions,
    /// Latest non-marker version of each key under `prefix`.
    ListVisible {
        prefix: String,
    },
}

/// One variant per [`BucketAction`], in the same order.
#[derive(Debug)]
pub enum BucketActionResult {
    PutVersioning,
    GetObjectLockConfiguration(ObjectLockConfiguration),
    PutObjectLockConfiguration,
    PutObject(Option<String>),
    DeleteObject(DeleteOutcome),
    ListVersions(VersionListing),
    ListVisible(Vec<(String, Bytes)>),
}

#[derive(Debug)]
pub struct Bucket {
    name: String,
    object_lock: bool,
    versioning: VersioningState,
    lock_configuration: Option<ObjectLockConfiguration>,
    entries: Vec<Entry>,
}

impl Bucket {
    pub fn versioning(&self) -> VersioningState {
        self.versioning
    }

    fn is_latest(&self, index: usize) -> bool {
        let key = &self.entries[index].key;
        !self.entries[index + 1..].iter().any(|e| &e.key == key)
    }

    fn latest(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().rev().find(|e| e.key == key)
    }

    fn new_version_id(&self) -> String {
        match self.versioning {
            VersioningState::Enabled => Uuid::new_v4().to_string(),
            _ => NULL_VERSION_ID.to_string(),
        }
    }

    /// Outside of `Enabled`, a write replaces the key's `null` version.
    fn drop_null_version(&mut self, key: &str) {
        if self.versioning != VersioningState::Enabled {
            self.entries
                .retain(|e| !(e.key == key && e.version_id == NULL_VERSION_ID));
        }
    }

    fn put_versioning(&mut self, enabled: bool) -> Result<(), StorageError> {
        if !enabled && self.object_lock {
            return Err(StorageError::InvalidRequest(format!(
                "versioning cannot be suspended on object lock bucket {}",
                self.name
            )));
        }
        self.versioning = match (enabled, self.versioning) {
            (true, _) => VersioningState::Enabled,
            (false, VersioningState::Unversioned) => VersioningState::Unversioned,
            (false, _) => VersioningState::Suspended,
        };
        Ok(())
    }

    fn get_lock_configuration(&self) -> Result<ObjectLockConfiguration, StorageError> {
        self.lock_configuration
            .ok_or_else(|| StorageError::NoObjectLockConfiguration(self.name.clone()))
    }

    fn put_lock_configuration(
        &mut self,
        configuration: ObjectLockConfiguration,
    ) -> Result<(), StorageError> {
        if !self.object_lock {
            return Err(StorageError::InvalidRequest(format!(
                "bucket {} was not created with object lock enabled",
                self.name
            )));
        }
        if !configuration.enabled {
            return Err(StorageError::InvalidRequest(
                "object lock cannot be disabled once enabled".to_string(),
            ));
        }
        if matches!(configuration.default_retention, Some(rule) if rule.days == 0) {
            return Err(StorageError::InvalidRequest(
                "default retention period must be a positive number of days".to_string(),
            ));
        }
        self.lock_configuration = Some(configuration);
        Ok(())
    }

    fn default_retention(&self, now: SystemTime) -> Option<Retention> {
        let rule = self.lock_configuration?.default_retention?;
        let period = Duration::from_secs(u64::from(rule.days) * SECONDS_PER_DAY);
        Some(Retention {
            mode: rule.mode,
            retain_until: now.checked_add(period)?,
        })
    }

    fn put_object(&mut self, key: String, body: Bytes) -> Option<String> {
        let retention = self.default_retention(SystemTime::now());
        let version_id = self.new_version_id();
        self.drop_null_version(&key);
        debug!(bucket = %self.name, %key, %version_id, size = body.len(), "Object stored");
        self.entries.push(Entry {
            key,
            version_id: version_id.clone(),
            kind: EntryKind::Object { body, retention },
        });
        (self.versioning != VersioningState::Unversioned).then_some(version_id)
    }

    fn delete_object(
        &mut self,
        key: String,
        version_id: Option<String>,
        bypass_governance_retention: bool,
    ) -> Result<DeleteOutcome, StorageError> {
        match version_id {
            Some(version_id) => {
                self.delete_version(&key, version_id, bypass_governance_retention)
            }
            None => Ok(self.delete_latest(key)),
        }
    }

    fn delete_latest(&mut self, key: String) -> DeleteOutcome {
        if self.versioning == VersioningState::Unversioned {
            self.entries.retain(|e| e.key != key);
            return DeleteOutcome::default();
        }
        let version_id = self.new_version_id();
        self.drop_null_version(&key);
        debug!(bucket = %self.name, %key, %version_id, "Delete marker added");
        self.entries.push(Entry {
            key,
            version_id: version_id.clone(),
            kind: EntryKind::DeleteMarker,
        });
        DeleteOutcome {
            version_id: Some(version_id),
            delete_marker: true,
        }
    }

    fn delete_version(
        &mut self,
        key: &str,
        version_id: String,
        bypass_governance_retention: bool,
    ) -> Result<DeleteOutcome, StorageError> {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| e.key == key && e.version_id == version_id)
        else {
            return Err(StorageError::NoSuchVersion {
                key: key.to_string(),
                version_id,
            });
        };

        let delete_marker = match &self.entries[index].kind {
            EntryKind::DeleteMarker => true,
            EntryKind::Object { retention, .. } => {
                if let Some(retention) = retention.filter(|r| r.is_active(SystemTime::now())) {
                    let allowed = retention.mode == RetentionMode::Governance
                        && bypass_governance_retention;
                    if !allowed {
                        return Err(StorageError::AccessDenied(format!(
                            "version {version_id} of {key} is locked in {} mode",
                            retention.mode
                        )));
                    }
                }
                false
            }
        };

        self.entries.remove(index);
        debug!(bucket = %self.name, %key, %version_id, delete_marker, "Version removed");
        Ok(DeleteOutcome {
            version_id: Some(version_id),
            delete_marker,
        })
    }

    fn list_versions(&self) -> VersionListing {
        let mut listing = VersionListing::default();
        for (index, entry) in self.entries.iter().enumerate() {
            let is_latest = self.is_latest(index);
            match entry.kind {
                EntryKind::Object { .. } => listing.versions.push(ObjectVersion {
                    key: entry.key.clone(),
                    version_id: entry.version_id.clone(),
                    is_latest,
                }),
                EntryKind::DeleteMarker => listing.delete_markers.push(DeleteMarker {
                    key: entry.key.clone(),
                    version_id: entry.version_id.clone(),
                    is_latest,
                }),
            }
        }
        listing
    }

    fn list_visible(&self, prefix: &str) -> Vec<(String, Bytes)> {
        let mut keys: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.key.as_str())
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort_unstable();
        keys.dedup();

        keys.into_iter()
            .filter_map(|key| match &self.latest(key)?.kind {
                EntryKind::Object { body, .. } => Some((key.to_string(), body.clone())),
                EntryKind::DeleteMarker => None,
            })
            .collect()
    }
}

#[async_trait]
impl ActorEntity for Bucket {
    type Id = String;
    type Create = BucketCreate;
    type Action = BucketAction;
    type ActionResult = BucketActionResult;
    type Context = ();
    type Error = StorageError;

    /// Lock buckets start versioned with an enabled, rule-less lock configuration.
    fn from_create_params(id: String, params: BucketCreate) -> Result<Self, StorageError> {
        if id.trim().is_empty() {
            return Err(StorageError::InvalidRequest("bucket name is empty".to_string()));
        }
        let (versioning, lock_configuration) = if params.object_lock {
            (
                VersioningState::Enabled,
                Some(ObjectLockConfiguration {
                    enabled: true,
                    default_retention: None,
                }),
            )
        } else {
            (VersioningState::Unversioned, None)
        };
        Ok(Self {
            name: id,
            object_lock: params.object_lock,
            versioning,
            lock_configuration,
            entries: Vec::new(),
        })
    }

    async fn on_delete(&self, _ctx: &()) -> Result<(), StorageError> {
        if !self.entries.is_empty() {
            return Err(StorageError::BucketNotEmpty(self.name.clone()));
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: BucketAction,
        _ctx: &(),
    ) -> Result<BucketActionResult, StorageError> {
        match action {
            BucketAction::PutVersioning(enabled) => self
                .put_versioning(enabled)
                .map(|_| BucketActionResult::PutVersioning),
            BucketAction::GetObjectLockConfiguration => self
                .get_lock_configuration()
                .map(BucketActionResult::GetObjectLockConfiguration),
            BucketAction::PutObjectLockConfiguration(configuration) => self
                .put_lock_configuration(configuration)
                .map(|_| BucketActionResult::PutObjectLockConfiguration),
            BucketAction::PutObject { key, body } => {
                Ok(BucketActionResult::PutObject(self.put_object(key, body)))
            }
            BucketAction::DeleteObject {
                key,
                version_id,
                bypass_governance_retention,
            } => self
                .delete_object(key, version_id, bypass_governance_retention)
                .map(BucketActionResult::DeleteObject),
            BucketAction::ListVersions => Ok(BucketActionResult::ListVersions(self.list_versions())),
            BucketAction::ListVisible { prefix } => {
                Ok(BucketActionResult::ListVisible(self.list_visible(&prefix)))
            }
        }
    }
}
