//! # Object Lifecycle Demo
//!
//! [`run_demo`] opens a query session and drives fifteen steps, strictly in
//! order, against an [`ObjectStore`] and a query engine:
//!
//! | #  | step                                                        |
//! |----|-------------------------------------------------------------|
//! | 1  | create the bucket with object lock enabled                  |
//! | 2  | enable versioning                                           |
//! | 3  | read back the object lock configuration                     |
//! | 4  | apply a 1 day GOVERNANCE default retention, read it back    |
//! | 5  | create the schema and the external table                    |
//! | 6  | upload the data file under the table location               |
//! | 7  | query the table (rows expected)                             |
//! | 8  | delete the object, capturing the delete marker version id   |
//! | 9  | query the table (no rows expected)                          |
//! | 10 | delete the delete marker with governance bypass             |
//! | 11 | query the table (original rows expected again)              |
//! | 12 | delete every version and delete marker with bypass          |
//! | 13 | delete the empty bucket                                     |
//! | 14 | drop the table, then the schema                             |
//! | 15 | close the query session                                     |
//!
//! Every step prints a status line and logs inside a `step` span. What
//! happens after a failed step is decided by [`StepPolicy`].

use crate::clients::{
    render_table, DeleteObjectRequest, ObjectLockConfiguration, ObjectStore, QueryConnector,
    QuerySessionHandle, RetentionMode, StorageError,
};
use crate::config::{Configuration, TableConfig};
use crate::lifecycle::error::{DemoError, StepError};
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Days of GOVERNANCE retention applied as the bucket default.
pub const DEFAULT_RETENTION_DAYS: u32 = 1;

/// `LIMIT` of every sample query.
pub const SAMPLE_LIMIT: usize = 10;

pub const CATALOG_QUERY: &str = "SELECT * FROM system.metadata.catalogs";

pub const STEP_NAMES: [&str; 15] = [
    "create bucket",
    "enable versioning",
    "get object lock configuration",
    "put default retention",
    "create schema and table",
    "upload data file",
    "query after upload",
    "delete object",
    "query after delete",
    "delete the delete marker",
    "query after restore",
    "delete all versions and markers",
    "delete bucket",
    "drop table and schema",
    "close query session",
];

pub const STEP_QUERY_AFTER_UPLOAD: usize = 7;
pub const STEP_QUERY_AFTER_DELETE: usize = 9;
pub const STEP_QUERY_AFTER_RESTORE: usize = 11;
pub const STEP_PURGE: usize = 12;

fn step_name(number: usize) -> &'static str {
    STEP_NAMES.get(number.wrapping_sub(1)).copied().unwrap_or("unknown")
}

/// What to do after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPolicy {
    /// Log the failure and run the next step anyway.
    #[default]
    ContinueOnError,
    /// Close the session and stop with [`DemoError::StepAborted`].
    AbortOnError,
}

/// Counts from [`purge_object_versions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub versions: usize,
    pub delete_markers: usize,
    pub failed: usize,
}

/// What a successful step observed.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Done,
    LockConfiguration(ObjectLockConfiguration),
    Uploaded {
        key: String,
        version_id: Option<String>,
    },
    Rows(usize),
    DeleteMarker(Option<String>),
    Restored(String),
    Purged(PurgeSummary),
}

impl fmt::Display for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutput::Done => f.write_str("done"),
            StepOutput::LockConfiguration(config) => write!(f, "{config}"),
            StepOutput::Uploaded { key, version_id } => match version_id {
                Some(v) => write!(f, "uploaded {key} as version {v}"),
                None => write!(f, "uploaded {key}"),
            },
            StepOutput::Rows(count) => write!(f, "{count} row(s)"),
            StepOutput::DeleteMarker(Some(v)) => write!(f, "delete marker {v}"),
            StepOutput::DeleteMarker(None) => f.write_str("object removed without a delete marker"),
            StepOutput::Restored(v) => write!(f, "removed delete marker {v}"),
            StepOutput::Purged(s) => write!(
                f,
                "removed {} version(s) and {} delete marker(s)",
                s.versions, s.delete_markers
            ),
        }
    }
}

#[derive(Debug)]
pub struct StepRecord {
    pub number: usize,
    pub name: &'static str,
    pub outcome: Result<StepOutput, StepError>,
}

/// Everything a run observed, one record per executed step.
#[derive(Debug, Default)]
pub struct DemoReport {
    /// `None` when the catalog listing failed.
    pub catalogs: Option<Vec<String>>,
    pub steps: Vec<StepRecord>,
}

impl DemoReport {
    pub fn step(&self, number: usize) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.number == number)
    }

    /// Row count seen by a query step, if it ran and succeeded.
    pub fn rows_at(&self, number: usize) -> Option<usize> {
        match self.step(number)?.outcome {
            Ok(StepOutput::Rows(count)) => Some(count),
            _ => None,
        }
    }

    /// Version id of the delete marker created by step 8.
    pub fn delete_marker_version_id(&self) -> Option<&str> {
        match &self.step(8)?.outcome {
            Ok(StepOutput::DeleteMarker(id)) => id.as_deref(),
            _ => None,
        }
    }

    pub fn purge_summary(&self) -> Option<PurgeSummary> {
        match self.step(STEP_PURGE)?.outcome {
            Ok(StepOutput::Purged(summary)) => Some(summary),
            _ => None,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.outcome.is_err())
    }

    pub fn succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub fn create_schema_sql(table: &TableConfig) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {} WITH (location = '{}')",
        table.qualified_schema(),
        table.location
    )
}

/// External table declaration for the configured connector.
pub fn create_table_sql(table: &TableConfig) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) WITH ({} = '{}', format = 'PARQUET')",
        table.qualified_table(),
        table.column_definitions,
        table.connector.location_property(),
        table.storage_location()
    )
}

pub fn select_sql(table: &TableConfig, limit: usize) -> String {
    format!("SELECT * FROM {} LIMIT {limit}", table.qualified_table())
}

pub fn drop_table_sql(table: &TableConfig) -> String {
    format!("DROP TABLE IF EXISTS {}", table.qualified_table())
}

pub fn drop_schema_sql(table: &TableConfig) -> String {
    format!("DROP SCHEMA IF EXISTS {}", table.qualified_schema())
}

/// Delete every version and delete marker in `bucket`, asserting governance
/// bypass on each call.
///
/// Individual failures are logged and counted; only a failed listing is an
/// error.
pub async fn purge_object_versions<S>(store: &S, bucket: &str) -> Result<PurgeSummary, StorageError>
where
    S: ObjectStore + ?Sized,
{
    let listing = store.list_object_versions(bucket).await?;
    info!(
        versions = listing.versions.len(),
        delete_markers = listing.delete_markers.len(),
        "Purging bucket"
    );

    let mut summary = PurgeSummary::default();
    for version in &listing.versions {
        let request =
            DeleteObjectRequest::version(bucket, &version.key, &version.version_id).bypass_governance();
        match store.delete_object(request).await {
            Ok(_) => summary.versions += 1,
            Err(e) => {
                warn!(key = %version.key, version_id = %version.version_id, error = %e, "Could not delete version");
                summary.failed += 1;
            }
        }
    }
    for marker in &listing.delete_markers {
        let request =
            DeleteObjectRequest::version(bucket, &marker.key, &marker.version_id).bypass_governance();
        match store.delete_object(request).await {
            Ok(_) => summary.delete_markers += 1,
            Err(e) => {
                warn!(key = %marker.key, version_id = %marker.version_id, error = %e, "Could not delete delete marker");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

struct DemoRun<'a, S: ObjectStore + ?Sized, C: QueryConnector> {
    config: &'a Configuration,
    store: &'a S,
    session: QuerySessionHandle<C>,
    data_file: &'a Path,
    object_key: String,
    policy: StepPolicy,
    delete_marker: Option<String>,
    report: DemoReport,
}

impl<'a, S: ObjectStore + ?Sized, C: QueryConnector> DemoRun<'a, S, C> {
    fn table(&self) -> &TableConfig {
        &self.config.table
    }

    fn bucket(&self) -> &str {
        &self.config.table.bucket
    }

    async fn list_catalogs(&mut self) {
        match self.session.execute(CATALOG_QUERY).await {
            Ok(result) => {
                let column = if result.columns.iter().any(|c| c == "catalog_name") {
                    "catalog_name"
                } else {
                    result.columns.first().map(String::as_str).unwrap_or_default()
                };
                let names: Vec<String> = result
                    .column_values(column)
                    .into_iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect();
                for name in &names {
                    info!(catalog = %name, "Catalog available");
                }
                println!("Catalogs: {}", names.join(", "));
                self.report.catalogs = Some(names);
            }
            Err(e) => {
                error!(error = %e, "Could not list catalogs");
                println!("Could not list catalogs: {e}");
            }
        }
    }

    /// Log and record one step; under [`StepPolicy::AbortOnError`] a failure
    /// closes the session and ends the run.
    async fn finish(
        &mut self,
        number: usize,
        outcome: Result<StepOutput, StepError>,
    ) -> Result<(), DemoError> {
        let name = step_name(number);
        match outcome {
            Ok(output) => {
                println!("[{number:>2}/{}] {name}: {output}", STEP_NAMES.len());
                info!(step = number, name, result = %output, "Step succeeded");
                self.report.steps.push(StepRecord {
                    number,
                    name,
                    outcome: Ok(output),
                });
                Ok(())
            }
            Err(e) => {
                println!("[{number:>2}/{}] {name}: FAILED: {e}", STEP_NAMES.len());
                error!(step = number, name, bucket = %self.bucket(), key = %self.object_key, error = %e, "Step failed");
                debug!(step = number, error = ?e, "Step failure detail");

                if self.policy == StepPolicy::AbortOnError {
                    if self.session.is_connected() {
                        if let Err(close_error) = self.session.disconnect().await {
                            debug!(step = number, error = %close_error, "Session close failed while aborting");
                        }
                    }
                    return Err(DemoError::StepAborted {
                        number,
                        name,
                        source: e,
                    });
                }
                self.report.steps.push(StepRecord {
                    number,
                    name,
                    outcome: Err(e),
                });
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<StepOutput, StepError> {
        info!(bucket = %self.bucket(), "Creating bucket with object lock enabled");
        self.store.create_bucket(self.bucket(), true).await?;
        Ok(StepOutput::Done)
    }

    async fn enable_versioning(&self) -> Result<StepOutput, StepError> {
        self.store.put_bucket_versioning(self.bucket(), true).await?;
        Ok(StepOutput::Done)
    }

    async fn read_lock_configuration(&self) -> Result<StepOutput, StepError> {
        let config = self.store.get_object_lock_configuration(self.bucket()).await?;
        info!(%config, "Object lock configuration");
        Ok(StepOutput::LockConfiguration(config))
    }

    async fn put_default_retention(&self) -> Result<StepOutput, StepError> {
        let rule = ObjectLockConfiguration::with_default_retention(
            RetentionMode::Governance,
            DEFAULT_RETENTION_DAYS,
        );
        self.store
            .put_object_lock_configuration(self.bucket(), rule)
            .await?;
        self.read_lock_configuration().await
    }

    async fn create_table(&self) -> Result<StepOutput, StepError> {
        let schema_sql = create_schema_sql(self.table());
        info!(sql = %schema_sql, "Creating schema");
        self.session.execute(&schema_sql).await?;

        let table_sql = create_table_sql(self.table());
        info!(sql = %table_sql, "Creating table");
        self.session.execute(&table_sql).await?;
        Ok(StepOutput::Done)
    }

    async fn upload(&self) -> Result<StepOutput, StepError> {
        let path = self.data_file;
        let data_file_error = |source| StepError::DataFile {
            path: path.to_path_buf(),
            source,
        };
        if path.file_name().is_none() {
            return Err(data_file_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "data file path has no file name",
            )));
        }
        let body = tokio::fs::read(path).await.map_err(data_file_error)?;
        info!(key = %self.object_key, size = body.len(), "Uploading data file");
        let version_id = self
            .store
            .put_object(self.bucket(), &self.object_key, Bytes::from(body))
            .await?;
        Ok(StepOutput::Uploaded {
            key: self.object_key.clone(),
            version_id,
        })
    }

    async fn query(&self) -> Result<StepOutput, StepError> {
        let sql = select_sql(self.table(), SAMPLE_LIMIT);
        let result = self.session.execute(&sql).await?;
        let rendered = render_table(&result);
        println!("{rendered}");
        info!(rows = result.row_count(), "Query finished");
        debug!("\n{rendered}");
        Ok(StepOutput::Rows(result.row_count()))
    }

    async fn delete_object(&mut self) -> Result<StepOutput, StepError> {
        info!(key = %self.object_key, "Deleting object; versioning turns this into a delete marker");
        let outcome = self
            .store
            .delete_object(DeleteObjectRequest::latest(self.bucket(), &self.object_key))
            .await?;
        self.delete_marker = if outcome.delete_marker {
            outcome.version_id
        } else {
            None
        };
        match &self.delete_marker {
            Some(id) => info!(version_id = %id, "Delete marker created"),
            None => warn!("Delete did not create a delete marker"),
        }
        Ok(StepOutput::DeleteMarker(self.delete_marker.clone()))
    }

    async fn remove_delete_marker(&self) -> Result<StepOutput, StepError> {
        let Some(version_id) = self.delete_marker.clone() else {
            return Err(StepError::MissingDeleteMarker {
                key: self.object_key.clone(),
            });
        };
        info!(key = %self.object_key, %version_id, "Deleting the delete marker");
        let request = DeleteObjectRequest::version(self.bucket(), &self.object_key, &version_id)
            .bypass_governance();
        self.store.delete_object(request).await?;
        Ok(StepOutput::Restored(version_id))
    }

    async fn purge(&self) -> Result<StepOutput, StepError> {
        let summary = purge_object_versions(self.store, self.bucket()).await?;
        if summary.failed > 0 {
            return Err(StepError::PurgeIncomplete {
                removed: summary.versions + summary.delete_markers,
                failed: summary.failed,
            });
        }
        Ok(StepOutput::Purged(summary))
    }

    async fn delete_bucket(&self) -> Result<StepOutput, StepError> {
        self.store.delete_bucket(self.bucket()).await?;
        Ok(StepOutput::Done)
    }

    async fn drop_table(&self) -> Result<StepOutput, StepError> {
        self.session.execute(&drop_table_sql(self.table())).await?;
        self.session.execute(&drop_schema_sql(self.table())).await?;
        Ok(StepOutput::Done)
    }

    async fn close_session(&mut self) -> Result<StepOutput, StepError> {
        self.session.disconnect().await?;
        Ok(StepOutput::Done)
    }

    async fn run(mut self) -> Result<DemoReport, DemoError> {
        self.list_catalogs().await;

        macro_rules! step {
            ($number:expr, $call:expr) => {{
                let span = info_span!("step", number = $number, name = step_name($number));
                let outcome = $call.instrument(span).await;
                self.finish($number, outcome).await?;
            }};
        }

        step!(1, self.create_bucket());
        step!(2, self.enable_versioning());
        step!(3, self.read_lock_configuration());
        step!(4, self.put_default_retention());
        step!(5, self.create_table());
        step!(6, self.upload());
        step!(STEP_QUERY_AFTER_UPLOAD, self.query());
        step!(8, self.delete_object());
        step!(STEP_QUERY_AFTER_DELETE, self.query());
        step!(10, self.remove_delete_marker());
        step!(STEP_QUERY_AFTER_RESTORE, self.query());
        step!(STEP_PURGE, self.purge());
        step!(13, self.delete_bucket());
        step!(14, self.drop_table());
        step!(15, self.close_session());

        Ok(self.report)
    }
}

/// Connect to the query engine and run the fifteen steps.
///
/// Fails only when no session can be opened, or when a step fails under
/// [`StepPolicy::AbortOnError`]; otherwise step failures are in the report.
pub async fn run_demo<S, C>(
    config: &Configuration,
    store: &S,
    connector: C,
    data_file: &Path,
    policy: StepPolicy,
) -> Result<DemoReport, DemoError>
where
    S: ObjectStore + ?Sized,
    C: QueryConnector,
{
    let mut session = QuerySessionHandle::new(config.query_session.clone(), connector);
    if !session.connect().await {
        let url = session.settings().url();
        println!("Could not establish a query session with {url}");
        return Err(DemoError::Connection { url });
    }

    let file_name = data_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let object_key = config.table.object_key(&file_name);
    info!(bucket = %config.table.bucket, key = %object_key, ?policy, "Starting object lifecycle demo");

    DemoRun {
        config,
        store,
        session,
        data_file,
        object_key,
        policy,
        delete_marker: None,
        report: DemoReport::default(),
    }
    .run()
    .await
}
