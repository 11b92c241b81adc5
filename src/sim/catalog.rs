//! Schemas and external tables of the simulated query engine.
//!
//! A schema only remembers which tables it holds, so that dropping a
//! non-empty schema can be refused. A table keeps its column list and storage
//! location; scanning it lists the visible objects under that location in the
//! simulated store and decodes each body as newline-delimited JSON rows.

use crate::clients::object_store::StorageError;
use crate::clients::query::{QueryError, QueryResult};
use crate::config::split_storage_uri;
use crate::framework::ActorEntity;
use crate::sim::statement::{ColumnDefinition, SchemaName, TableName};
use crate::sim::store::SimulatedObjectStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

fn query_error(name: &str, message: String) -> QueryError {
    QueryError::Query {
        name: name.to_string(),
        message,
    }
}

#[derive(Debug, Default)]
pub struct SchemaCreate {
    pub location: Option<String>,
}

#[derive(Debug)]
pub enum SchemaAction {
    AttachTable(String),
    DetachTable(String),
}

#[derive(Debug)]
pub struct Schema {
    name: SchemaName,
    location: Option<String>,
    tables: BTreeSet<String>,
}

impl Schema {
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[async_trait]
impl ActorEntity for Schema {
    type Id = SchemaName;
    type Create = SchemaCreate;
    type Action = SchemaAction;
    type ActionResult = usize;
    type Context = ();
    type Error = QueryError;

    fn from_create_params(id: SchemaName, params: SchemaCreate) -> Result<Self, QueryError> {
        if let Some(location) = &params.location {
            if split_storage_uri(location).is_none() {
                return Err(query_error(
                    "INVALID_SCHEMA_PROPERTY",
                    format!("invalid location URI: {location}"),
                ));
            }
        }
        Ok(Self {
            name: id,
            location: params.location,
            tables: BTreeSet::new(),
        })
    }

    async fn on_delete(&self, _ctx: &()) -> Result<(), QueryError> {
        if !self.tables.is_empty() {
            return Err(query_error(
                "SCHEMA_NOT_EMPTY",
                format!("Cannot drop non-empty schema '{}'", self.name),
            ));
        }
        Ok(())
    }

    /// Returns the number of tables left in the schema.
    async fn handle_action(&mut self, action: SchemaAction, _ctx: &()) -> Result<usize, QueryError> {
        match action {
            SchemaAction::AttachTable(table) => {
                self.tables.insert(table);
            }
            SchemaAction::DetachTable(table) => {
                self.tables.remove(&table);
            }
        }
        Ok(self.tables.len())
    }
}

#[derive(Debug)]
pub struct TableCreate {
    pub columns: Vec<ColumnDefinition>,
    pub location: String,
    pub format: Option<String>,
}

#[derive(Debug)]
pub enum TableAction {
    Scan { limit: Option<usize> },
}

#[derive(Debug)]
pub struct Table {
    name: TableName,
    columns: Vec<ColumnDefinition>,
    bucket: String,
    prefix: String,
}

impl Table {
    fn decode(&self, key: &str, body: &[u8], rows: &mut Vec<Vec<Value>>) -> Result<(), QueryError> {
        let text = std::str::from_utf8(body).map_err(|_| {
            query_error("BAD_DATA", format!("{key} is not a readable data file"))
        })?;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let record: Value = serde_json::from_str(line)
                .map_err(|e| query_error("BAD_DATA", format!("{key}: {e}")))?;
            let Value::Object(fields) = record else {
                return Err(query_error("BAD_DATA", format!("{key}: row is not an object")));
            };
            rows.push(
                self.columns
                    .iter()
                    .map(|c| fields.get(&c.name).cloned().unwrap_or(Value::Null))
                    .collect(),
            );
        }
        Ok(())
    }

    async fn scan(
        &self,
        limit: Option<usize>,
        store: &SimulatedObjectStore,
    ) -> Result<QueryResult, QueryError> {
        let objects = store
            .visible_objects(&self.bucket, &self.prefix)
            .await
            .map_err(|e| storage_failure(&self.name, e))?;

        let mut rows = Vec::new();
        for (key, body) in &objects {
            self.decode(key, body, &mut rows)?;
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        debug!(table = %self.name, files = objects.len(), rows = rows.len(), "Scanned");
        Ok(QueryResult {
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            rows,
        })
    }
}

fn storage_failure(table: &TableName, error: StorageError) -> QueryError {
    query_error(
        "STORAGE_ERROR",
        format!("cannot read data of table '{table}': {error}"),
    )
}

#[async_trait]
impl ActorEntity for Table {
    type Id = TableName;
    type Create = TableCreate;
    type Action = TableAction;
    type ActionResult = QueryResult;
    type Context = SimulatedObjectStore;
    type Error = QueryError;

    fn from_create_params(id: TableName, params: TableCreate) -> Result<Self, QueryError> {
        if let Some(format) = &params.format {
            if !format.eq_ignore_ascii_case("PARQUET") {
                return Err(query_error(
                    "INVALID_TABLE_PROPERTY",
                    format!("unsupported storage format: {format}"),
                ));
            }
        }
        let Some((bucket, path)) = split_storage_uri(&params.location) else {
            return Err(query_error(
                "INVALID_TABLE_PROPERTY",
                format!("invalid location URI: {}", params.location),
            ));
        };
        let path = path.trim_matches('/');
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
            name: id,
            columns: params.columns,
        })
    }

    /// External locations must point at an existing bucket.
    async fn on_create(&mut self, store: &SimulatedObjectStore) -> Result<(), QueryError> {
        store
            .visible_objects(&self.bucket, &self.prefix)
            .await
            .map(|_| ())
            .map_err(|e| {
                query_error(
                    "EXTERNAL_LOCATION_ERROR",
                    format!("external location of '{}' is not reachable: {e}", self.name),
                )
            })
    }

    async fn handle_action(
        &mut self,
        action: TableAction,
        store: &SimulatedObjectStore,
    ) -> Result<QueryResult, QueryError> {
        match action {
            TableAction::Scan { limit } => self.scan(limit, store).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::object_store::ObjectStore;
    use bytes::Bytes;

    fn name() -> TableName {
        TableName {
            catalog: "hive".into(),
            schema: "demo".into(),
            table: "customer".into(),
        }
    }

    fn create(location: &str) -> TableCreate {
        TableCreate {
            columns: vec![
                ColumnDefinition { name: "id".into(), data_type: "bigint".into() },
                ColumnDefinition { name: "name".into(), data_type: "varchar".into() },
            ],
            location: location.into(),
            format: Some("PARQUET".into()),
        }
    }

    #[test]
    fn test_schema_location_must_be_a_uri() {
        let schema = SchemaName { catalog: "hive".into(), schema: "demo".into() };
        let err = Schema::from_create_params(schema, SchemaCreate { location: Some("nope".into()) });
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_non_empty_schema_refuses_drop() {
        let id = SchemaName { catalog: "hive".into(), schema: "demo".into() };
        let mut schema = Schema::from_create_params(id, SchemaCreate::default()).unwrap();
        assert_eq!(schema.handle_action(SchemaAction::AttachTable("t".into()), &()).await.unwrap(), 1);
        assert!(schema.on_delete(&()).await.is_err());
        assert_eq!(schema.handle_action(SchemaAction::DetachTable("t".into()), &()).await.unwrap(), 0);
        assert!(schema.on_delete(&()).await.is_ok());
    }

    #[test]
    fn test_table_rejects_other_formats() {
        let mut params = create("s3a://bucket/hive/customer");
        params.format = Some("ORC".into());
        assert!(Table::from_create_params(name(), params).is_err());
    }

    #[tokio::test]
    async fn test_scan_reads_visible_rows_under_location() {
        let store = SimulatedObjectStore::spawn();
        store.create_bucket("bucket", true).await.unwrap();
        store
            .put_object(
                "bucket",
                "hive/customer/part-0",
                Bytes::from_static(b"{\"id\": 1, \"name\": \"Alice\"}\n{\"id\": 2}\n"),
            )
            .await
            .unwrap();
        store
            .put_object("bucket", "hive/orders/part-0", Bytes::from_static(b"{\"id\": 9}"))
            .await
            .unwrap();

        let mut table = Table::from_create_params(name(), create("s3a://bucket/hive/customer")).unwrap();
        table.on_create(&store).await.unwrap();

        let result = table
            .handle_action(TableAction::Scan { limit: Some(10) }, &store)
            .await
            .unwrap();
        assert_eq!(result.columns, ["id", "name"]);
        assert_eq!(result.rows, vec![
            vec![Value::from(1), Value::from("Alice")],
            vec![Value::from(2), Value::Null],
        ]);

        let limited = table.handle_action(TableAction::Scan { limit: Some(1) }, &store).await.unwrap();
        assert_eq!(limited.row_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_bucket_fails_table_creation() {
        let store = SimulatedObjectStore::spawn();
        let mut table = Table::from_create_params(name(), create("s3a://absent/hive/customer")).unwrap();
        let err = table.on_create(&store).await.unwrap_err();
        assert!(matches!(err, QueryError::Query { name, .. } if name == "EXTERNAL_LOCATION_ERROR"));
    }
}
